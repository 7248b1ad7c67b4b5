//! Stream resolver bridge.
//!
//! Turns a catalogue track id into a directly playable URL. Resolution usually
//! hits the network, can take several seconds and may fail transiently; the
//! core runs it on background tasks and applies its own timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Audio-only stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAudio {
    pub url: String,
    /// Duration reported by the resolver, when it knows it. Preferred over
    /// the catalogue descriptor's duration.
    pub duration_seconds: Option<u64>,
}

/// Video-capable stream. Any audio it carries is discarded by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVideo {
    pub url: String,
}

/// Host-provided stream resolver.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use bridge_traits::error::Result;
/// use bridge_traits::resolver::{ResolvedAudio, ResolvedVideo, StreamResolver};
///
/// struct StaticResolver;
///
/// #[async_trait]
/// impl StreamResolver for StaticResolver {
///     async fn resolve_audio(&self, track_id: &str) -> Result<ResolvedAudio> {
///         Ok(ResolvedAudio {
///             url: format!("https://cdn.example/{track_id}.m4a"),
///             duration_seconds: None,
///         })
///     }
///
///     async fn resolve_video(&self, track_id: &str) -> Result<ResolvedVideo> {
///         Ok(ResolvedVideo {
///             url: format!("https://cdn.example/{track_id}.mp4"),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve_audio(&self, track_id: &str) -> Result<ResolvedAudio>;

    async fn resolve_video(&self, track_id: &str) -> Result<ResolvedVideo>;
}
