//! # Playback Configuration
//!
//! Timing and policy knobs for the playback engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback engine configuration.
///
/// Every field has a serde default, so hosts can deserialize a partial
/// document and only override what they care about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// How often the audio position is sampled while playing.
    ///
    /// Default: 500 ms.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: Duration,

    /// How often the video is checked against the audio clock while a video
    /// is attached.
    ///
    /// Default: 400 ms.
    #[serde(default = "default_sync_interval")]
    pub sync_interval: Duration,

    /// Minimum spacing between two drift measurements. Sync ticks inside the
    /// window only enforce the pause state.
    ///
    /// Default: 2000 ms.
    #[serde(default = "default_sync_window")]
    pub sync_window: Duration,

    /// Drift (absolute, in milliseconds) above which the video is re-seeked
    /// to the audio position.
    ///
    /// Default: 1500.
    #[serde(default = "default_drift_threshold_ms")]
    pub drift_threshold_ms: u64,

    /// Delay between attaching a video and its first forced sync. Native
    /// engines report garbage positions while the stream opens.
    ///
    /// Default: 1000 ms.
    #[serde(default = "default_video_ready_grace")]
    pub video_ready_grace: Duration,

    /// Upper bound on a single stream resolution.
    ///
    /// Default: 15 seconds.
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout: Duration,

    /// Volume applied before the user changes it, in `0.0..=1.0`.
    ///
    /// Default: 1.0.
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    /// Fall back to simulated playback when resolve, create or initial play
    /// fails. When `false` the session moves to `Error` instead.
    ///
    /// Default: true.
    #[serde(default = "default_degraded_fallback")]
    pub degraded_fallback: bool,

    /// Whether the natural end of the last track starts the playlist over
    /// (like `next()`), or stops.
    ///
    /// Default: true.
    #[serde(default = "default_wrap_on_natural_end")]
    pub wrap_on_natural_end: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
            sync_interval: default_sync_interval(),
            sync_window: default_sync_window(),
            drift_threshold_ms: default_drift_threshold_ms(),
            video_ready_grace: default_video_ready_grace(),
            resolve_timeout: default_resolve_timeout(),
            initial_volume: default_initial_volume(),
            degraded_fallback: default_degraded_fallback(),
            wrap_on_natural_end: default_wrap_on_natural_end(),
        }
    }
}

impl PlaybackConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.progress_interval.is_zero() {
            return Err("progress_interval must be > 0".to_string());
        }

        if self.sync_interval.is_zero() {
            return Err("sync_interval must be > 0".to_string());
        }

        if self.sync_window < self.sync_interval {
            return Err("sync_window cannot be shorter than sync_interval".to_string());
        }

        if self.drift_threshold_ms == 0 {
            return Err("drift_threshold_ms must be > 0".to_string());
        }

        if self.resolve_timeout.is_zero() {
            return Err("resolve_timeout must be > 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err("initial_volume must be between 0.0 and 1.0".to_string());
        }

        Ok(())
    }

    pub(crate) fn sync_window_ms(&self) -> u64 {
        self.sync_window.as_millis() as u64
    }

    pub(crate) fn video_ready_grace_ms(&self) -> u64 {
        self.video_ready_grace.as_millis() as u64
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_progress_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_sync_interval() -> Duration {
    Duration::from_millis(400)
}

fn default_sync_window() -> Duration {
    Duration::from_millis(2000)
}

fn default_drift_threshold_ms() -> u64 {
    1500
}

fn default_video_ready_grace() -> Duration {
    Duration::from_millis(1000)
}

fn default_resolve_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_initial_volume() -> f32 {
    1.0
}

fn default_degraded_fallback() -> bool {
    true
}

fn default_wrap_on_natural_end() -> bool {
    true
}
