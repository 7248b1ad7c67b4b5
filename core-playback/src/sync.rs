//! # Audio/Video Synchronization
//!
//! Audio is the master clock. The video overlay follows it:
//!
//! - its paused/playing state mirrors the audio on every tick
//! - after a grace period following attach, it is force-seeked to the audio
//!   position once
//! - at most once per sync window its drift is measured, and drift above the
//!   threshold re-seeks the video
//!
//! The audio is never moved to match the video.

use crate::transport::VideoTransport;
use bridge_traits::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Per-video sync bookkeeping, reset whenever a video is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    last_check_ms: Option<u64>,
    last_drift_ms: Option<i64>,
    ready_at_ms: u64,
    pending_forced: bool,
}

impl SyncState {
    /// Fresh state for a video attached at `now_ms`. A forced resync is
    /// queued for when the grace period ends.
    pub fn new(now_ms: u64, grace_ms: u64) -> Self {
        Self {
            last_check_ms: None,
            last_drift_ms: None,
            ready_at_ms: now_ms.saturating_add(grace_ms),
            pending_forced: true,
        }
    }

    pub fn last_drift_ms(&self) -> Option<i64> {
        self.last_drift_ms
    }

    pub fn last_check_ms(&self) -> Option<u64> {
        self.last_check_ms
    }

    pub fn is_ready(&self, now_ms: u64) -> bool {
        now_ms >= self.ready_at_ms
    }

    pub fn has_pending_resync(&self) -> bool {
        self.pending_forced
    }
}

/// Result of one sync step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncAction {
    /// Nothing to do this tick.
    None,
    /// Video is still inside its grace period.
    Waiting,
    /// Forced seek to the audio position.
    Resynced { position_ms: u64 },
    /// Drift exceeded the threshold and the video was re-seeked.
    DriftCorrected { drift_ms: i64, position_ms: u64 },
}

/// Drift policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncMonitor {
    window_ms: u64,
    threshold_ms: u64,
}

impl SyncMonitor {
    pub fn new(window_ms: u64, threshold_ms: u64) -> Self {
        Self {
            window_ms,
            threshold_ms,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn threshold_ms(&self) -> u64 {
        self.threshold_ms
    }

    /// Mirrors the audio's pause state onto the video.
    pub fn enforce_pause_state(&self, video: &mut VideoTransport, audio_playing: bool) -> Result<()> {
        if audio_playing && video.is_paused() {
            trace!("Resuming video to follow audio");
            video.play()
        } else if !audio_playing && !video.is_paused() {
            trace!("Pausing video to follow audio");
            video.pause()
        } else {
            Ok(())
        }
    }

    /// Seeks the video to the audio position regardless of drift.
    ///
    /// Before the grace period ends the request is queued and performed by
    /// the first [`tick`](Self::tick) after it.
    pub fn force_resync(
        &self,
        state: &mut SyncState,
        video: &mut VideoTransport,
        audio_position_ms: u64,
        now_ms: u64,
    ) -> Result<SyncAction> {
        if !state.is_ready(now_ms) {
            state.pending_forced = true;
            return Ok(SyncAction::Waiting);
        }

        video.seek(audio_position_ms)?;
        state.pending_forced = false;
        state.last_check_ms = Some(now_ms);
        state.last_drift_ms = Some(0);
        debug!(position_ms = audio_position_ms, "Video resynced to audio");
        Ok(SyncAction::Resynced {
            position_ms: audio_position_ms,
        })
    }

    /// One periodic sync step.
    pub fn tick(
        &self,
        state: &mut SyncState,
        video: &mut VideoTransport,
        audio_position_ms: u64,
        audio_playing: bool,
        now_ms: u64,
    ) -> Result<SyncAction> {
        self.enforce_pause_state(video, audio_playing)?;

        if !state.is_ready(now_ms) {
            return Ok(SyncAction::Waiting);
        }

        if state.pending_forced {
            return self.force_resync(state, video, audio_position_ms, now_ms);
        }

        if let Some(last) = state.last_check_ms {
            if now_ms.saturating_sub(last) < self.window_ms {
                return Ok(SyncAction::None);
            }
        }

        let video_position_ms = video.position_ms();
        let drift_ms = audio_position_ms as i64 - video_position_ms as i64;
        state.last_check_ms = Some(now_ms);
        state.last_drift_ms = Some(drift_ms);

        if drift_ms.unsigned_abs() > self.threshold_ms {
            video.seek(audio_position_ms)?;
            debug!(
                drift_ms,
                audio_ms = audio_position_ms,
                video_ms = video_position_ms,
                "Video drift corrected"
            );
            return Ok(SyncAction::DriftCorrected {
                drift_ms,
                position_ms: audio_position_ms,
            });
        }

        trace!(drift_ms, "Video within drift threshold");
        Ok(SyncAction::None)
    }
}
