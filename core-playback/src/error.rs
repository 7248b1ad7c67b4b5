//! # Playback Error Types
//!
//! Errors raised by the playback core, plus the [`FailurePhase`] tag attached
//! to every failure that is logged or published.

use bridge_traits::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Step of the load pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    /// Stream resolution (network, resolver error or timeout).
    Resolve,
    /// Creating the native playback handle.
    Create,
    /// Starting or continuing playback on an existing handle.
    Play,
}

impl FailurePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            FailurePhase::Resolve => "resolve",
            FailurePhase::Create => "create",
            FailurePhase::Play => "play",
        }
    }
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Load pipeline
    // ========================================================================
    /// The stream resolver failed or timed out.
    #[error("Failed to resolve stream for track {track_id}: {message}")]
    ResolveFailure { track_id: String, message: String },

    /// The native engine refused to create a handle for a resolved stream.
    #[error("Failed to create transport for track {track_id}: {message}")]
    TransportCreateFailure { track_id: String, message: String },

    /// The native handle failed to start or failed mid-playback.
    #[error("Playback failed for track {track_id}: {message}")]
    TransportFailure { track_id: String, message: String },

    // ========================================================================
    // Playlist
    // ========================================================================
    /// Requested start index is outside the playlist.
    #[error("Invalid playlist index {index} (playlist length {len})")]
    InvalidIndex { index: usize, len: usize },

    /// Operation requires at least one track.
    #[error("Playlist is empty")]
    EmptyPlaylist,

    // ========================================================================
    // Player lifecycle
    // ========================================================================
    /// The control loop has shut down.
    #[error("Player is closed")]
    PlayerClosed,

    /// Invalid playback configuration.
    #[error("Invalid playback configuration: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Pipeline phase for load failures, `None` for everything else.
    pub fn phase(&self) -> Option<FailurePhase> {
        match self {
            PlaybackError::ResolveFailure { .. } => Some(FailurePhase::Resolve),
            PlaybackError::TransportCreateFailure { .. } => Some(FailurePhase::Create),
            PlaybackError::TransportFailure { .. } => Some(FailurePhase::Play),
            _ => None,
        }
    }

    /// Track the failure belongs to, when known.
    pub fn track_id(&self) -> Option<&str> {
        match self {
            PlaybackError::ResolveFailure { track_id, .. }
            | PlaybackError::TransportCreateFailure { track_id, .. }
            | PlaybackError::TransportFailure { track_id, .. } => Some(track_id),
            _ => None,
        }
    }

    /// Returns `true` if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::ResolveFailure { .. }
                | PlaybackError::TransportCreateFailure { .. }
                | PlaybackError::TransportFailure { .. }
                | PlaybackError::Bridge(BridgeError::OperationFailed(_))
        )
    }

    /// Returns `true` if the player keeps working after this error.
    ///
    /// Only a closed player or a broken configuration is terminal.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PlaybackError::PlayerClosed | PlaybackError::Config(_) | PlaybackError::Runtime(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_failures_carry_phase_and_track() {
        let err = PlaybackError::ResolveFailure {
            track_id: "abc".to_string(),
            message: "timed out after 15000ms".to_string(),
        };
        assert_eq!(err.phase(), Some(FailurePhase::Resolve));
        assert_eq!(err.track_id(), Some("abc"));
        assert!(err.is_transient());
        assert!(err.is_recoverable());

        let err = PlaybackError::TransportCreateFailure {
            track_id: "abc".to_string(),
            message: "codec".to_string(),
        };
        assert_eq!(err.phase().map(FailurePhase::as_str), Some("create"));
    }

    #[test]
    fn lifecycle_errors_are_terminal() {
        assert!(!PlaybackError::PlayerClosed.is_recoverable());
        assert!(!PlaybackError::Config("bad".into()).is_recoverable());
        assert!(PlaybackError::InvalidIndex { index: 4, len: 3 }.is_recoverable());
        assert_eq!(PlaybackError::EmptyPlaylist.phase(), None);
    }

    #[test]
    fn invalid_index_message() {
        let err = PlaybackError::InvalidIndex { index: 5, len: 2 };
        assert_eq!(err.to_string(), "Invalid playlist index 5 (playlist length 2)");
    }

    #[test]
    fn bridge_errors_convert() {
        let err: PlaybackError = BridgeError::OperationFailed("busy".into()).into();
        assert!(err.is_transient());
        assert!(matches!(err, PlaybackError::Bridge(_)));
    }
}
