//! Native media engine bridge.
//!
//! The host owns the actual decoding and output pipeline. The core asks a
//! [`MediaEngine`] for one [`MediaHandle`] per resolved stream and drives it
//! through play/pause/seek calls. Handles are exclusively owned by the core and
//! are always released before a replacement for the same slot is created.
//!
//! Calls are synchronous: they are issued from the player's control task and
//! are expected to return quickly (queue the command on the native side and
//! report state through [`MediaHandle::state`]).

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What a handle is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

/// Request for a new native playback handle.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    /// Resolved, directly playable URL.
    pub url: String,
    pub kind: MediaKind,
    /// Start with output muted.
    pub muted: bool,
    /// Initial volume in `0.0..=1.0`.
    pub volume: f32,
    /// Ask the engine to drop the audio track entirely. Set for video
    /// overlays so the stream can never become audible.
    pub strip_audio: bool,
}

impl MediaRequest {
    /// Audible audio stream at the given volume.
    pub fn audio(url: impl Into<String>, volume: f32) -> Self {
        Self {
            url: url.into(),
            kind: MediaKind::Audio,
            muted: false,
            volume: volume.clamp(0.0, 1.0),
            strip_audio: false,
        }
    }

    /// Silent video stream: zero volume, muted and audio-stripped.
    pub fn silent_video(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: MediaKind::Video,
            muted: true,
            volume: 0.0,
            strip_audio: true,
        }
    }
}

/// Engine-reported lifecycle state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Stream is being opened or buffered.
    Opening,
    Playing,
    Paused,
    Stopped,
    /// The stream reached its natural end.
    Ended,
    /// The engine gave up on the stream.
    Error,
}

impl EngineState {
    pub fn is_ended(self) -> bool {
        matches!(self, EngineState::Ended)
    }

    pub fn is_error(self) -> bool {
        matches!(self, EngineState::Error)
    }
}

/// Factory for native playback handles.
pub trait MediaEngine: Send + Sync {
    /// Open a new handle for the request. The handle starts stopped; the
    /// caller decides when to play.
    fn create(&self, request: &MediaRequest) -> Result<Box<dyn MediaHandle>>;
}

/// One native playback instance.
pub trait MediaHandle: Send {
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Seek to an absolute position in milliseconds.
    fn seek(&mut self, position_ms: u64) -> Result<()>;

    /// Volume in `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32) -> Result<()>;

    fn set_muted(&mut self, muted: bool) -> Result<()>;

    /// Current playback position in milliseconds.
    fn position_ms(&self) -> u64;

    fn state(&self) -> EngineState;

    /// Release native resources. The handle must not be used afterwards.
    fn release(&mut self);
}
