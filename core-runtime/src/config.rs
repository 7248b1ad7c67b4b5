//! # Core Configuration Module
//!
//! Wires host bridges into the player core.
//!
//! ## Overview
//!
//! [`CoreConfig`] is built through a builder that validates required
//! capabilities up front, so a misconfigured host fails at startup with an
//! actionable message instead of at the first play request.
//!
//! ## Required Dependencies
//!
//! - `StreamResolver` - turns track ids into playable URLs
//!
//! ## Optional Dependencies
//!
//! - `MediaEngine` - native playback. Without it every track plays through the
//!   simulated transport and video is never attached.
//! - `Clock` - monotonic time source (default: [`SystemClock`])
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .stream_resolver(Arc::new(MyResolver))
//!     .media_engine(Arc::new(MyEngine))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No stream resolver: CapabilityMissing
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing stream resolver");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, MediaEngine, StreamResolver, SystemClock};
use std::sync::Arc;

/// Largest accepted event buffer. Larger values only hide stuck subscribers.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration for the player.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Stream resolver (required)
    pub stream_resolver: Arc<dyn StreamResolver>,

    /// Native media engine (optional, simulated playback when absent)
    pub media_engine: Option<Arc<dyn MediaEngine>>,

    /// Monotonic time source
    pub clock: Arc<dyn Clock>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("stream_resolver", &"StreamResolver { ... }")
            .field(
                "media_engine",
                &self.media_engine.as_ref().map(|_| "MediaEngine { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Allow the silent video overlay. When off, video toggles are ignored.
    pub enable_video: bool,

    /// Refuse to start without a native `MediaEngine` instead of running
    /// simulated-only.
    pub require_native_engine: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_video: true,
            require_native_engine: false,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Whether tracks can play through a native engine.
    pub fn has_native_engine(&self) -> bool {
        self.media_engine.is_some()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - Event buffer size is in `1..=10_000`
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.require_native_engine && self.media_engine.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "MediaEngine".to_string(),
                message: "Native playback is required but no MediaEngine was provided. \
                          Inject the platform media engine or disable require_native_engine \
                          to allow simulated playback."
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn stream_resolver_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "StreamResolver".to_string(),
        message: "StreamResolver implementation is required to turn track ids into \
                  playable URLs. Inject the host's resolver with .stream_resolver()."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    stream_resolver: Option<Arc<dyn StreamResolver>>,
    media_engine: Option<Arc<dyn MediaEngine>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the stream resolver (required).
    pub fn stream_resolver(mut self, resolver: Arc<dyn StreamResolver>) -> Self {
        self.stream_resolver = Some(resolver);
        self
    }

    /// Sets the native media engine.
    pub fn media_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engine = Some(engine);
        self
    }

    /// Overrides the time source. Tests pass a `ManualClock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn enable_video(mut self, enabled: bool) -> Self {
        self.features.enable_video = enabled;
        self
    }

    pub fn require_native_engine(mut self, required: bool) -> Self {
        self.features.require_native_engine = required;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no stream resolver was set, or a
    ///   native engine is required but absent
    /// - [`Error::Config`] when a setting is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let stream_resolver = self
            .stream_resolver
            .ok_or_else(stream_resolver_missing_error)?;

        let config = CoreConfig {
            stream_resolver,
            media_engine: self.media_engine,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
