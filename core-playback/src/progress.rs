//! Position sampling and end-of-track detection.

use crate::session::{PlaybackSession, PlaybackStatus};
use serde::{Deserialize, Serialize};

/// What one progress tick observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    /// Session is not playing; nothing sampled.
    Idle,
    Progress { position_ms: u64 },
    /// The track reached its natural end.
    Completed { position_ms: u64 },
    /// The native engine reported an error mid-playback.
    Failed { message: String },
}

/// Samples the audio clock of a playing session.
///
/// Completion comes from the transport: a native handle reporting `Ended`, or
/// a simulated clock reaching its duration. Position alone never ends a
/// native track.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressTicker;

impl ProgressTicker {
    pub fn new() -> Self {
        Self
    }

    pub fn tick(&self, session: &mut PlaybackSession) -> TickOutcome {
        if session.status() != PlaybackStatus::Playing {
            return TickOutcome::Idle;
        }

        if session.audio_failed() {
            return TickOutcome::Failed {
                message: "media engine reported an error".to_string(),
            };
        }

        let position_ms = session.update_position();
        if session.audio_ended() {
            TickOutcome::Completed { position_ms }
        } else {
            TickOutcome::Progress { position_ms }
        }
    }
}

/// Formats a position as `MM:SS`, or `H:MM:SS` from one hour up.
pub fn format_position(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
