//! Timeout-bounded access to the host's [`StreamResolver`].

use crate::error::{PlaybackError, Result};
use bridge_traits::{ResolvedAudio, ResolvedVideo, StreamResolver};
use core_async::time::{timeout, Duration};
use core_runtime::logging::redact_url;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Wraps a [`StreamResolver`] with the configured timeout and maps every
/// failure to [`PlaybackError::ResolveFailure`].
#[derive(Clone)]
pub struct StreamResolverClient {
    resolver: Arc<dyn StreamResolver>,
    timeout: Duration,
}

impl fmt::Debug for StreamResolverClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamResolverClient")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StreamResolverClient {
    pub fn new(resolver: Arc<dyn StreamResolver>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(skip(self), fields(phase = "resolve"))]
    pub async fn resolve_audio(&self, track_id: &str) -> Result<ResolvedAudio> {
        let resolved = self
            .bounded(track_id, self.resolver.resolve_audio(track_id))
            .await?;
        debug!(
            url = %redact_url(&resolved.url),
            duration_seconds = ?resolved.duration_seconds,
            "Audio stream resolved"
        );
        Ok(resolved)
    }

    #[instrument(skip(self), fields(phase = "resolve"))]
    pub async fn resolve_video(&self, track_id: &str) -> Result<ResolvedVideo> {
        let resolved = self
            .bounded(track_id, self.resolver.resolve_video(track_id))
            .await?;
        debug!(url = %redact_url(&resolved.url), "Video stream resolved");
        Ok(resolved)
    }

    async fn bounded<T, F>(&self, track_id: &str, call: F) -> Result<T>
    where
        F: Future<Output = bridge_traits::error::Result<T>>,
    {
        match timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(PlaybackError::ResolveFailure {
                track_id: track_id.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(PlaybackError::ResolveFailure {
                track_id: track_id.to_string(),
                message: format!("timed out after {}ms", self.timeout.as_millis()),
            }),
        }
    }
}
