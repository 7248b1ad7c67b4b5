//! # Player
//!
//! Public façade over the playback engine.
//!
//! [`Player::builder`] validates configuration and spawns one control task
//! that owns a [`PlaybackEngine`]. Every public method turns into a message on
//! that task's queue, so callers never touch playback state directly.
//!
//! After each handled message the control task:
//!
//! - starts or stops the progress and sync [`PeriodicTask`]s to match the
//!   engine state
//! - publishes a [`PlaybackSnapshot`] on a `watch` channel when it changed
//! - invokes the registered callback after every caller command, and after
//!   any other message that changed the snapshot
//!
//! # Example
//!
//! ```ignore
//! use core_playback::{Player, Track};
//! use core_runtime::config::CoreConfig;
//!
//! # async fn example(resolver: std::sync::Arc<dyn bridge_traits::StreamResolver>) -> core_playback::Result<()> {
//! let core = CoreConfig::builder().stream_resolver(resolver).build()?;
//! let player = Player::builder(core)
//!     .on_snapshot(|snapshot| println!("{} {}", snapshot.position_label, snapshot.duration_label))
//!     .spawn()?;
//!
//! let tracks = vec![Track::new("a", "First"), Track::new("b", "Second")];
//! player.play(tracks[0].clone(), tracks.clone(), 0).await?;
//! player.toggle_play_pause()?;
//! player.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::PlaybackConfig;
use crate::engine::{Command, ControlMessage, PlaybackEngine, PlaybackSnapshot};
use crate::error::{PlaybackError, Result};
use crate::playlist::PlaylistController;
use crate::track::Track;
use core_async::periodic::PeriodicTask;
use core_async::sync::{mpsc, oneshot, watch, CancellationToken};
use core_async::time::Duration;
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Receives the snapshot after every command and every other change, on the
/// control task.
pub type SnapshotCallback = Arc<dyn Fn(&PlaybackSnapshot) + Send + Sync>;

/// Configures and spawns a [`Player`].
pub struct PlayerBuilder {
    core: CoreConfig,
    playback: PlaybackConfig,
    on_snapshot: Option<SnapshotCallback>,
    seed: Option<u64>,
}

impl PlayerBuilder {
    pub fn playback_config(mut self, config: PlaybackConfig) -> Self {
        self.playback = config;
        self
    }

    /// Registers the presentation callback.
    pub fn on_snapshot<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PlaybackSnapshot) + Send + Sync + 'static,
    {
        self.on_snapshot = Some(Arc::new(callback));
        self
    }

    /// Seeds the shuffle RNG for reproducible shuffle orders.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates configuration and starts the control task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> Result<Player> {
        self.core.validate()?;
        self.playback.validate().map_err(PlaybackError::Config)?;

        let events = EventBus::new(self.core.event_buffer_size);
        let (tx, rx) = mpsc::unbounded_channel();
        let playlist = match self.seed {
            Some(seed) => PlaylistController::with_seed(seed),
            None => PlaylistController::new(),
        };

        let progress_interval = self.playback.progress_interval;
        let sync_interval = self.playback.sync_interval;
        let engine = PlaybackEngine::new(
            &self.core,
            self.playback,
            playlist,
            events.clone(),
            tx.clone(),
        );
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());
        let token = CancellationToken::new();

        info!(
            native_engine = self.core.has_native_engine(),
            video = self.core.features.enable_video,
            "Starting player"
        );

        let control = ControlLoop {
            engine,
            rx,
            tx: tx.clone(),
            token: token.clone(),
            snapshots: snapshot_tx,
            on_snapshot: self.on_snapshot,
            progress_interval,
            sync_interval,
            progress: None,
            sync: None,
        };
        core_async::spawn(control.run());

        Ok(Player {
            tx,
            snapshots: snapshot_rx,
            events,
            token,
        })
    }
}

/// Handle to a running playback control task.
///
/// Dropping the handle stops playback and releases every native handle.
pub struct Player {
    tx: mpsc::UnboundedSender<ControlMessage>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
    events: EventBus,
    token: CancellationToken,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Player {
    pub fn builder(core: CoreConfig) -> PlayerBuilder {
        PlayerBuilder {
            core,
            playback: PlaybackConfig::default(),
            on_snapshot: None,
            seed: None,
        }
    }

    /// Opens `playlist` and starts `track`.
    ///
    /// `index` locates `track` in `playlist`; when it does not, the track is
    /// looked up by id. An empty `playlist` plays `track` alone. Fails with
    /// [`PlaybackError::InvalidIndex`] when the track cannot be located.
    pub async fn play(&self, track: Track, playlist: Vec<Track>, index: usize) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Play {
            track,
            playlist,
            index,
            reply,
        })?;
        response.await.map_err(|_| PlaybackError::PlayerClosed)?
    }

    pub fn toggle_play_pause(&self) -> Result<()> {
        self.send(Command::TogglePlayPause)
    }

    pub fn next(&self) -> Result<()> {
        self.send(Command::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.send(Command::Previous)
    }

    pub fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.send(Command::SeekTo(position_ms))
    }

    /// Sets the audio volume, clamped to `0.0..=1.0`.
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(Command::SetVolume(volume))
    }

    pub fn toggle_shuffle(&self) -> Result<()> {
        self.send(Command::ToggleShuffle)
    }

    pub fn toggle_repeat(&self) -> Result<()> {
        self.send(Command::ToggleRepeat)
    }

    pub fn toggle_video(&self) -> Result<()> {
        self.send(Command::ToggleVideo)
    }

    /// Swaps in an edited copy of the active playlist without restarting the
    /// current track, unless it was removed.
    pub fn update_playlist(&self, tracks: Vec<Track>) -> Result<()> {
        self.send(Command::UpdatePlaylist(tracks))
    }

    /// Stops playback, releases every handle and ends the control task.
    pub async fn close(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Close { reply: Some(reply) })?;
        response.await.map_err(|_| PlaybackError::PlayerClosed)?;
        // Resolves once the control task has closed its queue.
        self.tx.closed().await;
        Ok(())
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(ControlMessage::Command(command))
            .map_err(|_| PlaybackError::PlayerClosed)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

// ============================================================================
// Control task
// ============================================================================

struct ControlLoop {
    engine: PlaybackEngine,
    rx: mpsc::UnboundedReceiver<ControlMessage>,
    tx: mpsc::UnboundedSender<ControlMessage>,
    token: CancellationToken,
    snapshots: watch::Sender<PlaybackSnapshot>,
    on_snapshot: Option<SnapshotCallback>,
    progress_interval: Duration,
    sync_interval: Duration,
    progress: Option<PeriodicTask>,
    sync: Option<PeriodicTask>,
}

impl ControlLoop {
    async fn run(mut self) {
        debug!("Control loop started");

        loop {
            let message = core_async::select! {
                biased;
                _ = self.token.cancelled() => break,
                message = self.rx.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            let is_command = matches!(message, ControlMessage::Command(_));
            let flow = self.engine.handle_message(message);
            self.reconcile_tasks();
            self.publish(is_command);

            if flow.is_break() {
                break;
            }
        }

        self.progress = None;
        self.sync = None;
        self.engine.shutdown();
        self.rx.close();
        self.publish(false);
        debug!("Control loop stopped");
    }

    /// Starts or stops the periodic tasks to match the engine state.
    fn reconcile_tasks(&mut self) {
        let wants_progress = self.engine.wants_progress_ticks();
        reconcile(&mut self.progress, wants_progress, || {
            spawn_ticker(
                "progress",
                self.progress_interval,
                &self.token,
                &self.tx,
                || ControlMessage::ProgressTick,
            )
        });

        let wants_sync = self.engine.wants_sync_ticks();
        reconcile(&mut self.sync, wants_sync, || {
            spawn_ticker(
                "video-sync",
                self.sync_interval,
                &self.token,
                &self.tx,
                || ControlMessage::SyncTick,
            )
        });
    }

    /// `always_notify` calls the callback even when the snapshot is unchanged.
    fn publish(&self, always_notify: bool) {
        let snapshot = self.engine.snapshot();
        let changed = self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot.clone();
                true
            }
        });

        if changed || always_notify {
            if let Some(callback) = &self.on_snapshot {
                callback(&snapshot);
            }
        }
    }
}

fn reconcile<F>(slot: &mut Option<PeriodicTask>, wanted: bool, start: F)
where
    F: FnOnce() -> PeriodicTask,
{
    match (slot.is_some(), wanted) {
        (false, true) => *slot = Some(start()),
        (true, false) => {
            if let Some(task) = slot.take() {
                debug!(task = task.name(), "Stopping periodic task");
                task.cancel();
            }
        }
        _ => {}
    }
}

/// Periodic task that only enqueues `message()` on the control queue. It
/// stops on its own once the queue is gone.
fn spawn_ticker(
    name: &'static str,
    period: Duration,
    token: &CancellationToken,
    tx: &mpsc::UnboundedSender<ControlMessage>,
    message: fn() -> ControlMessage,
) -> PeriodicTask {
    let tx = tx.clone();
    PeriodicTask::spawn(name, period, token.child_token(), move || {
        tx.send(message()).is_ok()
    })
}
