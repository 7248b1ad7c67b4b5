//! # Event Bus System
//!
//! Typed events for the player core, published over a broadcast channel.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: one enum per domain (playback, playlist, video), wrapped
//!   in [`CoreEvent`]
//! - **EventBus**: broadcast sender shared by the player internals
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! Presentation code usually renders from the player's snapshot callback.
//! Events are for side consumers: analytics, scrobblers, diagnostics overlays.
//!
//! ```text
//! ┌───────────────┐    emit     ┌───────────┐    subscribe   ┌────────────┐
//! │ PlaybackEngine├────────────>│ EventBus  ├───────────────>│ Subscriber │
//! └───────────────┘             │ (broadcast│                └────────────┘
//!                               │  channel) │    subscribe   ┌────────────┐
//!                               │           ├───────────────>│ Subscriber │
//!                               └───────────┘                └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut stream = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Playback(_)));
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Completed {
//!     track_id: "abc".to_string(),
//! }))
//! .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Track completed");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Non-fatal.
//! - **`RecvError::Closed`**: every sender was dropped; the player has shut
//!   down.
//!
//! `emit` fails when nobody is subscribed. Publishers ignore that error.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Playlist(PlaylistEvent),
    Video(VideoEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Playlist(e) => e.description(),
            CoreEvent::Video(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Degraded { .. }) => EventSeverity::Warning,
            CoreEvent::Video(VideoEvent::Unavailable { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Playlist(PlaylistEvent::Selected { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to the audio session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A track became current and its stream is being resolved.
    Loading {
        track_id: String,
        /// Resolution attempt; later attempts supersede earlier ones.
        attempt_id: u64,
    },
    /// Playback started for a freshly loaded track.
    Started {
        track_id: String,
        title: String,
        /// `true` when the simulated transport is standing in for the
        /// native engine.
        degraded: bool,
    },
    Paused {
        track_id: String,
        position_ms: u64,
    },
    Resumed {
        track_id: String,
        position_ms: u64,
    },
    Seeked {
        track_id: String,
        position_ms: u64,
    },
    /// Track reached its natural end.
    Completed {
        track_id: String,
    },
    /// Playback stopped without a replacement (end of queue or close).
    Stopped {
        track_id: String,
    },
    /// Native playback failed and the simulated transport took over.
    Degraded {
        track_id: String,
        /// `resolve`, `create` or `play`.
        phase: String,
        message: String,
    },
    Error {
        track_id: Option<String>,
        phase: String,
        message: String,
        /// Whether navigation or toggling play can retry.
        recoverable: bool,
    },
    /// Volume as a percentage.
    VolumeChanged {
        volume_percent: u8,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loading { .. } => "Resolving track stream",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Seeked { .. } => "Playback position moved",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Degraded { .. } => "Playing in degraded mode",
            PlaybackEvent::Error { .. } => "Playback error",
            PlaybackEvent::VolumeChanged { .. } => "Volume changed",
        }
    }
}

// ============================================================================
// Playlist Events
// ============================================================================

/// Events related to the active playlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaylistEvent {
    /// A playlist was opened for playback. Shuffle and repeat are reset.
    Selected {
        track_count: usize,
        start_index: Option<usize>,
    },
    /// The caller edited the active playlist in place.
    Updated {
        track_count: usize,
        current_index: Option<usize>,
    },
    CurrentChanged {
        index: usize,
        track_id: String,
    },
    ShuffleChanged {
        enabled: bool,
    },
    RepeatChanged {
        enabled: bool,
    },
    /// The player was closed and the playlist discarded.
    Closed,
}

impl PlaylistEvent {
    fn description(&self) -> &str {
        match self {
            PlaylistEvent::Selected { .. } => "Playlist selected",
            PlaylistEvent::Updated { .. } => "Playlist updated",
            PlaylistEvent::CurrentChanged { .. } => "Current track changed",
            PlaylistEvent::ShuffleChanged { .. } => "Shuffle toggled",
            PlaylistEvent::RepeatChanged { .. } => "Repeat toggled",
            PlaylistEvent::Closed => "Playlist closed",
        }
    }
}

// ============================================================================
// Video Events
// ============================================================================

/// Events related to the silent video overlay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum VideoEvent {
    /// A video stream was attached for the current track.
    Attached {
        track_id: String,
    },
    /// The video stream was released.
    Detached {
        track_id: Option<String>,
    },
    /// No video could be attached for this track. Audio is unaffected.
    Unavailable {
        track_id: String,
        message: String,
    },
    /// Drift exceeded the threshold and the video was re-seeked.
    DriftCorrected {
        track_id: String,
        /// `audio - video` before the correction.
        drift_ms: i64,
    },
    /// Unconditional resync after a seek, a load or the ready grace period.
    Resynced {
        track_id: String,
        position_ms: u64,
    },
}

impl VideoEvent {
    fn description(&self) -> &str {
        match self {
            VideoEvent::Attached { .. } => "Video attached",
            VideoEvent::Detached { .. } => "Video detached",
            VideoEvent::Unavailable { .. } => "Video unavailable",
            VideoEvent::DriftCorrected { .. } => "Video drift corrected",
            VideoEvent::Resynced { .. } => "Video resynced",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every clone publishes to the same
/// subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per
    /// subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. [`CoreConfig`](crate::config::CoreConfig)
    /// validation rejects that value before a bus is built.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
