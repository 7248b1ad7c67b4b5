//! # Playback Session
//!
//! State of the currently loaded track: status, position, duration, volume and
//! the transports that play it.
//!
//! ```text
//! Idle → Resolving → Loaded → Playing ⇄ Paused → Ended
//!                 (any) → Error
//! ```
//!
//! A session exclusively owns one [`AudioTransport`] and at most one
//! [`VideoTransport`]. Both are released before the session is replaced.
//! Releasing a session also cancels any stream resolution still running for
//! it.

use crate::error::{PlaybackError, Result};
use crate::sync::{SyncAction, SyncMonitor, SyncState};
use crate::track::Track;
use crate::transport::{AudioTransport, VideoTransport};
use core_async::sync::CancellationToken;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Lifecycle status of a [`PlaybackSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Idle,
    Resolving,
    Loaded,
    Playing,
    Paused,
    Ended,
    Error,
}

impl PlaybackStatus {
    /// `true` for states where the audio clock is advancing or can resume.
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackStatus::Playing | PlaybackStatus::Paused)
    }

    /// `true` once a session can only be restarted by reloading.
    pub fn is_finished(self) -> bool {
        matches!(self, PlaybackStatus::Ended | PlaybackStatus::Error)
    }
}

/// One loaded track.
#[derive(Debug)]
pub struct PlaybackSession {
    id: Uuid,
    track: Track,
    attempt_id: u64,
    status: PlaybackStatus,
    position_ms: u64,
    duration_ms: u64,
    volume: f32,
    degraded: bool,
    audio: Option<AudioTransport>,
    video: Option<VideoTransport>,
    sync: Option<SyncState>,
    video_attempt: Option<u64>,
    /// Cancelled on release; parent of the video resolution token.
    cancel: CancellationToken,
    video_cancel: Option<CancellationToken>,
    last_error: Option<String>,
}

impl PlaybackSession {
    pub fn new(track: Track, attempt_id: u64, volume: f32) -> Self {
        let duration_ms = track.duration_ms();
        Self {
            id: Uuid::new_v4(),
            track,
            attempt_id,
            status: PlaybackStatus::Idle,
            position_ms: 0,
            duration_ms,
            volume: volume.clamp(0.0, 1.0),
            degraded: false,
            audio: None,
            video: None,
            sync: None,
            video_attempt: None,
            cancel: CancellationToken::new(),
            video_cancel: None,
            last_error: None,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn attempt_id(&self) -> u64 {
        self.attempt_id
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn audio(&self) -> Option<&AudioTransport> {
        self.audio.as_ref()
    }

    pub fn sync_state(&self) -> Option<&SyncState> {
        self.sync.as_ref()
    }

    // ------------------------------------------------------------------------
    // Audio lifecycle
    // ------------------------------------------------------------------------

    pub fn begin_resolving(&mut self) {
        self.status = PlaybackStatus::Resolving;
        self.last_error = None;
    }

    /// Installs the audio transport and moves to `Loaded`.
    ///
    /// A non-zero `duration_ms` (resolver-reported) replaces the catalogue
    /// duration. Any previous audio transport is released first.
    pub fn attach_audio(&mut self, mut transport: AudioTransport, duration_ms: u64) -> Result<()> {
        if let Some(mut old) = self.audio.take() {
            old.release();
        }

        if duration_ms > 0 {
            self.duration_ms = duration_ms;
        }
        self.degraded = transport.is_simulated();
        self.position_ms = 0;

        let applied = transport.set_volume(self.volume);
        self.audio = Some(transport);
        self.status = PlaybackStatus::Loaded;
        applied.map_err(|e| self.play_error(e.to_string()))
    }

    /// Auto-start after loading: `Loaded → Playing`.
    pub fn start(&mut self) -> Result<()> {
        let result = match self.audio.as_mut() {
            Some(audio) => audio.play(),
            None => return Err(PlaybackError::Internal("start without audio".into())),
        };
        result.map_err(|e| self.play_error(e.to_string()))?;
        self.status = PlaybackStatus::Playing;
        self.mirror_video_state();
        Ok(())
    }

    /// `Playing → Paused`. Returns `false` when nothing changed.
    pub fn pause(&mut self) -> Result<bool> {
        if self.status != PlaybackStatus::Playing {
            return Ok(false);
        }
        if let Some(audio) = self.audio.as_mut() {
            let paused = audio.pause();
            self.position_ms = audio.position_ms();
            paused.map_err(|e| self.play_error(e.to_string()))?;
        }
        self.status = PlaybackStatus::Paused;
        self.mirror_video_state();
        Ok(true)
    }

    /// `Paused → Playing`. Returns `false` when nothing changed.
    pub fn resume(&mut self) -> Result<bool> {
        if self.status != PlaybackStatus::Paused {
            return Ok(false);
        }
        if let Some(audio) = self.audio.as_mut() {
            let resumed = audio.play();
            resumed.map_err(|e| self.play_error(e.to_string()))?;
        }
        self.status = PlaybackStatus::Playing;
        self.mirror_video_state();
        Ok(true)
    }

    /// Moves the audio to `target_ms`, clamped to the known duration.
    ///
    /// Native engines ignore seeks on a paused handle, so a paused session
    /// plays, seeks and pauses again, in that order. Returns the position
    /// actually applied, or `None` when there is no seekable audio.
    pub fn seek(&mut self, target_ms: u64) -> Result<Option<u64>> {
        if !self.status.is_active() {
            return Ok(None);
        }
        let target_ms = if self.duration_ms > 0 {
            target_ms.min(self.duration_ms)
        } else {
            target_ms
        };

        let paused = self.status == PlaybackStatus::Paused;
        let result = match self.audio.as_mut() {
            Some(audio) if paused => paused_seek(audio, target_ms),
            Some(audio) => audio.seek(target_ms),
            None => return Ok(None),
        };
        result.map_err(|e| self.play_error(e.to_string()))?;

        self.position_ms = target_ms;
        Ok(Some(target_ms))
    }

    /// Non-finite values leave the volume unchanged.
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !volume.is_finite() {
            return Ok(());
        }
        self.volume = volume.clamp(0.0, 1.0);
        let result = match self.audio.as_mut() {
            Some(audio) => audio.set_volume(self.volume),
            None => Ok(()),
        };
        result.map_err(|e| self.play_error(e.to_string()))
    }

    /// Samples the audio clock into `position_ms`.
    pub fn update_position(&mut self) -> u64 {
        if let Some(audio) = self.audio.as_ref() {
            self.position_ms = audio.position_ms();
        }
        self.position_ms
    }

    pub fn audio_ended(&self) -> bool {
        self.audio.as_ref().is_some_and(AudioTransport::is_ended)
    }

    pub fn audio_failed(&self) -> bool {
        self.audio.as_ref().is_some_and(AudioTransport::has_failed)
    }

    /// Natural end of stream: stops the transports and moves to `Ended`.
    pub fn mark_ended(&mut self) {
        if let Some(audio) = self.audio.as_mut() {
            if let Err(e) = audio.stop() {
                debug!(track_id = %self.track.id, error = %e, "Stop at end of track failed");
            }
        }
        if self.duration_ms > 0 {
            self.position_ms = self.duration_ms;
        }
        self.status = PlaybackStatus::Ended;
        self.mirror_video_state();
    }

    /// Releases every handle and moves to `Error`.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.release();
        self.last_error = Some(message.into());
        self.status = PlaybackStatus::Error;
    }

    // ------------------------------------------------------------------------
    // Video
    // ------------------------------------------------------------------------

    /// Token for the audio resolution task. Cancelled when the session is
    /// released.
    pub fn resolution_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Records the attempt id of an in-flight video resolution and returns
    /// the token its task must watch. A previous video request is cancelled.
    pub fn request_video(&mut self, attempt_id: u64) -> CancellationToken {
        if let Some(previous) = self.video_cancel.take() {
            previous.cancel();
        }
        let token = self.cancel.child_token();
        self.video_cancel = Some(token.clone());
        self.video_attempt = Some(attempt_id);
        token
    }

    pub fn video_attempt(&self) -> Option<u64> {
        self.video_attempt
    }

    /// Installs a video overlay and queues its forced resync after the grace
    /// period. Any previous video is released first.
    pub fn attach_video(&mut self, video: VideoTransport, now_ms: u64, grace_ms: u64) {
        self.detach_video();
        self.video = Some(video);
        self.sync = Some(SyncState::new(now_ms, grace_ms));
        self.video_attempt = None;
        self.mirror_video_state();
    }

    /// Releases the video overlay. Returns `true` if one was attached.
    pub fn detach_video(&mut self) -> bool {
        self.video_attempt = None;
        if let Some(token) = self.video_cancel.take() {
            token.cancel();
        }
        self.sync = None;
        match self.video.take() {
            Some(mut video) => {
                video.release();
                true
            }
            None => false,
        }
    }

    pub fn video_failed(&self) -> bool {
        self.video.as_ref().is_some_and(VideoTransport::has_failed)
    }

    /// Periodic sync step. No-op without an attached video.
    pub fn sync_video(&mut self, monitor: &SyncMonitor, now_ms: u64) -> Result<SyncAction> {
        let playing = self.status == PlaybackStatus::Playing;
        let audio_ms = self.current_audio_position();
        let (Some(video), Some(state)) = (self.video.as_mut(), self.sync.as_mut()) else {
            return Ok(SyncAction::None);
        };
        Ok(monitor.tick(state, video, audio_ms, playing, now_ms)?)
    }

    /// Forced resync after a seek. Queued when still inside the grace period.
    pub fn force_video_resync(&mut self, monitor: &SyncMonitor, now_ms: u64) -> Result<SyncAction> {
        let playing = self.status == PlaybackStatus::Playing;
        let audio_ms = self.current_audio_position();
        let (Some(video), Some(state)) = (self.video.as_mut(), self.sync.as_mut()) else {
            return Ok(SyncAction::None);
        };
        monitor.enforce_pause_state(video, playing)?;
        Ok(monitor.force_resync(state, video, audio_ms, now_ms)?)
    }

    fn current_audio_position(&self) -> u64 {
        self.audio
            .as_ref()
            .map_or(self.position_ms, AudioTransport::position_ms)
    }

    fn mirror_video_state(&mut self) {
        let playing = self.status == PlaybackStatus::Playing;
        if let Some(video) = self.video.as_mut() {
            let result = if playing && video.is_paused() {
                video.play()
            } else if !playing && !video.is_paused() {
                video.pause()
            } else {
                Ok(())
            };
            if let Err(e) = result {
                warn!(track_id = %self.track.id, error = %e, "Video did not follow audio state");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------------

    /// Stops and releases all handles. Idempotent.
    pub fn release(&mut self) {
        self.cancel.cancel();
        self.detach_video();
        if let Some(mut audio) = self.audio.take() {
            audio.release();
            debug!(track_id = %self.track.id, session = %self.id, "Audio released");
        }
    }

    fn play_error(&self, message: String) -> PlaybackError {
        PlaybackError::TransportFailure {
            track_id: self.track.id.clone(),
            message,
        }
    }
}

fn paused_seek(audio: &mut AudioTransport, target_ms: u64) -> bridge_traits::error::Result<()> {
    audio.play()?;
    audio.seek(target_ms)?;
    audio.pause()
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.release();
    }
}
