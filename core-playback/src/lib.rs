//! # Playback & Synchronization Engine
//!
//! Playlist navigation, the audio playback state machine and the optional
//! silent video overlay kept in sync with the audio clock.
//!
//! ## Overview
//!
//! This crate handles:
//! - Playlist ordering with shuffle and repeat ([`playlist`])
//! - Stream resolution with a timeout ([`resolver`])
//! - Native or simulated audio, and muted video ([`transport`])
//! - Per-track state machine including the paused-seek sequence ([`session`])
//! - Video drift correction ([`sync`]) and position sampling ([`progress`])
//! - A single-task control loop behind the [`Player`] façade ([`engine`],
//!   [`player`])
//!
//! Host integrations come in through `bridge-traits`: a `StreamResolver` is
//! required, a `MediaEngine` is optional. Without an engine every track plays
//! on the simulated transport and video is unavailable.

pub mod config;
pub mod engine;
pub mod error;
pub mod player;
pub mod playlist;
pub mod progress;
pub mod resolver;
pub mod session;
pub mod sync;
pub mod track;
pub mod transport;

pub use config::PlaybackConfig;
pub use engine::{Command, ControlMessage, PlaybackEngine, PlaybackSnapshot};
pub use error::{FailurePhase, PlaybackError, Result};
pub use player::{Player, PlayerBuilder, SnapshotCallback};
pub use playlist::{PlaylistController, PlaylistState, ReplaceOutcome};
pub use progress::{format_position, ProgressTicker, TickOutcome};
pub use session::{PlaybackSession, PlaybackStatus};
pub use sync::{SyncAction, SyncMonitor, SyncState};
pub use track::Track;
pub use transport::{AudioTransport, TransportFactory, VideoTransport};
