//! # Playback Engine
//!
//! The state owned by the player's control task.
//!
//! ## Overview
//!
//! Every mutation of playlist or session state goes through
//! [`PlaybackEngine::handle_message`], which is only ever called from one
//! task. Slow work (stream resolution) runs on spawned tasks that post their
//! result back as a [`ControlMessage`] tagged with the attempt id it was
//! started for. A result whose attempt id no longer matches the current
//! session is stale and dropped.
//!
//! Periodic work arrives the same way: the player's progress and sync tasks
//! only enqueue [`ControlMessage::ProgressTick`] and
//! [`ControlMessage::SyncTick`].

use crate::config::PlaybackConfig;
use crate::error::{FailurePhase, PlaybackError, Result};
use crate::playlist::{PlaylistController, ReplaceOutcome};
use crate::progress::{format_position, ProgressTicker, TickOutcome};
use crate::resolver::StreamResolverClient;
use crate::session::{PlaybackSession, PlaybackStatus};
use crate::sync::{SyncAction, SyncMonitor};
use crate::track::Track;
use crate::transport::TransportFactory;
use bridge_traits::{Clock, ResolvedAudio, ResolvedVideo};
use core_async::sync::{mpsc, oneshot};
use core_runtime::config::{CoreConfig, FeatureFlags};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, PlaylistEvent, VideoEvent};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Caller requests, as queued by the [`Player`](crate::player::Player).
#[derive(Debug)]
pub enum Command {
    /// Open `playlist` and start `track` at `index`.
    Play {
        track: Track,
        playlist: Vec<Track>,
        index: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    TogglePlayPause,
    Next,
    Previous,
    SeekTo(u64),
    SetVolume(f32),
    ToggleShuffle,
    ToggleRepeat,
    ToggleVideo,
    /// Swap in an edited version of the active playlist.
    UpdatePlaylist(Vec<Track>),
    Close {
        reply: Option<oneshot::Sender<()>>,
    },
}

/// Everything the control task reacts to.
#[derive(Debug)]
pub enum ControlMessage {
    Command(Command),
    AudioResolved {
        attempt_id: u64,
        track_id: String,
        result: Result<ResolvedAudio>,
    },
    VideoResolved {
        attempt_id: u64,
        track_id: String,
        result: Result<ResolvedVideo>,
    },
    ProgressTick,
    SyncTick,
}

impl Command {
    /// Playlist navigation that has nothing to act on without tracks.
    fn needs_tracks(&self) -> bool {
        matches!(
            self,
            Command::Next | Command::Previous | Command::ToggleShuffle | Command::ToggleRepeat
        )
    }
}

impl From<Command> for ControlMessage {
    fn from(command: Command) -> Self {
        ControlMessage::Command(command)
    }
}

/// Presentation state published after every handled message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub track: Option<Track>,
    pub current_index: Option<usize>,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub position_label: String,
    pub duration_label: String,
    pub volume: f32,
    pub shuffle: bool,
    pub repeat: bool,
    /// The user asked for video.
    pub video_enabled: bool,
    /// A video overlay is attached right now.
    pub video_active: bool,
    /// Simulated playback is standing in for the native engine.
    pub degraded: bool,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            track: None,
            current_index: None,
            position_ms: 0,
            duration_ms: 0,
            position_label: format_position(0),
            duration_label: format_position(0),
            volume: 1.0,
            shuffle: false,
            repeat: false,
            video_enabled: false,
            video_active: false,
            degraded: false,
        }
    }
}

/// Playlist, session and the services they use.
pub struct PlaybackEngine {
    playlist: PlaylistController,
    session: Option<PlaybackSession>,
    transports: TransportFactory,
    resolver: StreamResolverClient,
    sync: SyncMonitor,
    ticker: ProgressTicker,
    events: EventBus,
    clock: Arc<dyn Clock>,
    config: PlaybackConfig,
    features: FeatureFlags,
    video_enabled: bool,
    volume: f32,
    last_attempt: u64,
    tx: mpsc::UnboundedSender<ControlMessage>,
}

impl PlaybackEngine {
    /// Creates an engine whose background resolutions post back on `tx`.
    pub fn new(
        core: &CoreConfig,
        config: PlaybackConfig,
        playlist: PlaylistController,
        events: EventBus,
        tx: mpsc::UnboundedSender<ControlMessage>,
    ) -> Self {
        Self {
            playlist,
            session: None,
            transports: TransportFactory::new(core.media_engine.clone(), Arc::clone(&core.clock)),
            resolver: StreamResolverClient::new(
                Arc::clone(&core.stream_resolver),
                config.resolve_timeout,
            ),
            sync: SyncMonitor::new(config.sync_window_ms(), config.drift_threshold_ms),
            ticker: ProgressTicker::new(),
            events,
            clock: Arc::clone(&core.clock),
            volume: config.initial_volume.clamp(0.0, 1.0),
            config,
            features: core.features,
            video_enabled: false,
            last_attempt: 0,
            tx,
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn playlist(&self) -> &PlaylistController {
        &self.playlist
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session
            .as_ref()
            .map_or(PlaybackStatus::Idle, PlaybackSession::status)
    }

    /// The progress task should run.
    pub fn wants_progress_ticks(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    /// The sync task should run.
    pub fn wants_sync_ticks(&self) -> bool {
        self.session.as_ref().is_some_and(PlaybackSession::has_video)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let session = self.session.as_ref();
        let position_ms = session.map_or(0, PlaybackSession::position_ms);
        let duration_ms = session.map_or_else(
            || self.playlist.current_track().map_or(0, Track::duration_ms),
            PlaybackSession::duration_ms,
        );

        PlaybackSnapshot {
            status: self.status(),
            track: session
                .map(|s| s.track().clone())
                .or_else(|| self.playlist.current_track().cloned()),
            current_index: self.playlist.current_index(),
            position_ms,
            duration_ms,
            position_label: format_position(position_ms),
            duration_label: format_position(duration_ms),
            volume: self.volume,
            shuffle: self.playlist.is_shuffled(),
            repeat: self.playlist.is_repeat_enabled(),
            video_enabled: self.video_enabled,
            video_active: session.is_some_and(PlaybackSession::has_video),
            degraded: session.is_some_and(PlaybackSession::is_degraded),
        }
    }

    /// Applies one message. Returns `Break` once the player is closed.
    pub fn handle_message(&mut self, message: ControlMessage) -> ControlFlow<()> {
        match message {
            ControlMessage::Command(command) => return self.handle_command(command),
            ControlMessage::AudioResolved {
                attempt_id,
                track_id,
                result,
            } => self.on_audio_resolved(attempt_id, &track_id, result),
            ControlMessage::VideoResolved {
                attempt_id,
                track_id,
                result,
            } => self.on_video_resolved(attempt_id, &track_id, result),
            ControlMessage::ProgressTick => self.on_progress_tick(),
            ControlMessage::SyncTick => self.on_sync_tick(),
        }
        ControlFlow::Continue(())
    }

    /// Releases every handle. Called when the control loop exits.
    pub fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.release();
        }
    }

    fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        if command.needs_tracks() {
            if let Err(e) = self.playlist.ensure_not_empty() {
                debug!(?command, error = %e, "Command ignored");
                return ControlFlow::Continue(());
            }
        }

        match command {
            Command::Play {
                track,
                playlist,
                index,
                reply,
            } => {
                let result = self.play(track, playlist, index);
                if reply.send(result).is_err() {
                    debug!("Play caller went away before the reply");
                }
            }
            Command::TogglePlayPause => self.toggle_play_pause(),
            Command::Next => {
                if self.playlist.next().is_some() {
                    self.load_current();
                }
            }
            Command::Previous => {
                if self.playlist.previous().is_some() {
                    self.load_current();
                } else {
                    debug!("Already at the first track");
                }
            }
            Command::SeekTo(position_ms) => self.seek(position_ms),
            Command::SetVolume(volume) => self.set_volume(volume),
            Command::ToggleShuffle => {
                let enabled = self.playlist.toggle_shuffle();
                info!(enabled, "Shuffle toggled");
                self.emit(CoreEvent::Playlist(PlaylistEvent::ShuffleChanged { enabled }));
            }
            Command::ToggleRepeat => {
                let enabled = self.playlist.toggle_repeat();
                info!(enabled, "Repeat toggled");
                self.emit(CoreEvent::Playlist(PlaylistEvent::RepeatChanged { enabled }));
            }
            Command::ToggleVideo => self.toggle_video(),
            Command::UpdatePlaylist(tracks) => self.update_playlist(tracks),
            Command::Close { reply } => {
                self.close();
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    fn play(&mut self, track: Track, mut playlist: Vec<Track>, index: usize) -> Result<()> {
        if playlist.is_empty() {
            playlist.push(track.clone());
        }

        let index = if playlist.get(index).is_some_and(|t| t.id == track.id) {
            index
        } else {
            playlist
                .iter()
                .position(|t| t.id == track.id)
                .ok_or(PlaybackError::InvalidIndex {
                    index,
                    len: playlist.len(),
                })?
        };

        let track_count = playlist.len();
        self.playlist.select_playlist(playlist, index)?;
        info!(track_id = %track.id, index, track_count, "Playlist selected");
        self.emit(CoreEvent::Playlist(PlaylistEvent::Selected {
            track_count,
            start_index: Some(index),
        }));
        self.load_current();
        Ok(())
    }

    fn toggle_play_pause(&mut self) {
        let track_id = match self.session.as_ref() {
            Some(session) => session.track().id.clone(),
            None => {
                if self.playlist.current_index().is_some() {
                    self.load_current();
                }
                return;
            }
        };

        match self.status() {
            PlaybackStatus::Playing => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                match session.pause() {
                    Ok(_) => {
                        let position_ms = session.position_ms();
                        info!(track_id = %track_id, position_ms, "Paused");
                        self.emit(CoreEvent::Playback(PlaybackEvent::Paused {
                            track_id,
                            position_ms,
                        }));
                    }
                    Err(e) => self.fail_session(FailurePhase::Play, e.to_string()),
                }
            }
            PlaybackStatus::Paused => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                match session.resume() {
                    Ok(_) => {
                        let position_ms = session.position_ms();
                        info!(track_id = %track_id, position_ms, "Resumed");
                        self.emit(CoreEvent::Playback(PlaybackEvent::Resumed {
                            track_id,
                            position_ms,
                        }));
                    }
                    Err(e) => self.fail_session(FailurePhase::Play, e.to_string()),
                }
            }
            PlaybackStatus::Ended | PlaybackStatus::Error => {
                info!(track_id = %track_id, "Restarting finished track");
                self.load_current();
            }
            status => debug!(?status, "Play/pause ignored while loading"),
        }
    }

    fn seek(&mut self, target_ms: u64) {
        let now_ms = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let track_id = session.track().id.clone();

        let position_ms = match session.seek(target_ms) {
            Ok(Some(position_ms)) => position_ms,
            Ok(None) => {
                debug!(track_id = %track_id, target_ms, "Seek ignored, nothing playing");
                return;
            }
            Err(e) => {
                self.fail_session(FailurePhase::Play, e.to_string());
                return;
            }
        };
        debug!(track_id = %track_id, position_ms, "Seeked");

        let resync = session.force_video_resync(&self.sync, now_ms);
        self.emit(CoreEvent::Playback(PlaybackEvent::Seeked {
            track_id: track_id.clone(),
            position_ms,
        }));
        match resync {
            Ok(action) => self.report_sync_action(&track_id, action),
            Err(e) => self.drop_video(&track_id, e.to_string()),
        }
    }

    fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            warn!(volume, "Ignoring non-finite volume");
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.set_volume(self.volume) {
                warn!(track_id = %session.track().id, error = %e, "Volume change failed");
            }
        }
        self.emit(CoreEvent::Playback(PlaybackEvent::VolumeChanged {
            volume_percent: (self.volume * 100.0).round() as u8,
        }));
    }

    fn toggle_video(&mut self) {
        if !self.features.enable_video {
            debug!("Video toggle ignored, video is disabled by feature flags");
            return;
        }

        self.video_enabled = !self.video_enabled;
        info!(enabled = self.video_enabled, "Video toggled");

        if self.video_enabled {
            if self
                .session
                .as_ref()
                .is_some_and(|s| !s.status().is_finished())
            {
                self.request_video();
            }
        } else if let Some(session) = self.session.as_mut() {
            if session.detach_video() {
                let track_id = Some(session.track().id.clone());
                self.emit(CoreEvent::Video(VideoEvent::Detached { track_id }));
            }
        }
    }

    fn update_playlist(&mut self, tracks: Vec<Track>) {
        let track_count = tracks.len();
        let outcome = self.playlist.replace_tracks(tracks);
        self.emit(CoreEvent::Playlist(PlaylistEvent::Updated {
            track_count,
            current_index: self.playlist.current_index(),
        }));

        match outcome {
            ReplaceOutcome::CurrentKept(index) => {
                debug!(index, track_count, "Playlist updated, current track kept");
            }
            ReplaceOutcome::CurrentReplaced(index) => {
                info!(index, track_count, "Current track removed from playlist");
                if self.session.is_some() {
                    self.load_current();
                }
            }
            ReplaceOutcome::Emptied => {
                info!("Playlist emptied, stopping");
                self.stop();
            }
        }
    }

    fn close(&mut self) {
        info!("Closing player");
        self.stop();
        self.playlist.clear();
        self.emit(CoreEvent::Playlist(PlaylistEvent::Closed));
    }

    /// Releases the session and returns to `Idle`.
    fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.release();
            let track_id = session.track().id.clone();
            self.emit(CoreEvent::Playback(PlaybackEvent::Stopped { track_id }));
        }
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    fn next_attempt_id(&mut self) -> u64 {
        self.last_attempt += 1;
        self.last_attempt
    }

    /// Replaces the session with a fresh one for the current playlist entry
    /// and starts resolving it.
    fn load_current(&mut self) {
        // The old handles go before anything new is created.
        if let Some(mut previous) = self.session.take() {
            previous.release();
        }

        let (Some(index), Some(track)) = (
            self.playlist.current_index(),
            self.playlist.current_track().cloned(),
        ) else {
            return;
        };

        let attempt_id = self.next_attempt_id();
        let mut session = PlaybackSession::new(track.clone(), attempt_id, self.volume);
        session.begin_resolving();
        let cancel = session.resolution_token();
        info!(
            track_id = %track.id,
            attempt_id,
            session = %session.id(),
            "Loading track"
        );
        self.session = Some(session);

        self.emit(CoreEvent::Playlist(PlaylistEvent::CurrentChanged {
            index,
            track_id: track.id.clone(),
        }));
        self.emit(CoreEvent::Playback(PlaybackEvent::Loading {
            track_id: track.id.clone(),
            attempt_id,
        }));

        let resolver = self.resolver.clone();
        let tx = self.tx.clone();
        let track_id = track.id;
        core_async::spawn(async move {
            let result = core_async::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = resolver.resolve_audio(&track_id) => Some(result),
            };
            match result {
                Some(result) => {
                    let _ = tx.send(ControlMessage::AudioResolved {
                        attempt_id,
                        track_id,
                        result,
                    });
                }
                None => debug!(track_id = %track_id, attempt_id, "Audio resolution cancelled"),
            }
        });

        if self.video_enabled {
            self.request_video();
        }
    }

    fn on_audio_resolved(
        &mut self,
        attempt_id: u64,
        track_id: &str,
        result: Result<ResolvedAudio>,
    ) {
        let current = self
            .session
            .as_ref()
            .filter(|s| s.attempt_id() == attempt_id && s.status() == PlaybackStatus::Resolving);
        if current.is_none() {
            debug!(track_id, attempt_id, "Discarding stale audio resolution");
            return;
        }

        let resolved = match result {
            Ok(resolved) => resolved,
            Err(e) => {
                self.handle_load_failure(FailurePhase::Resolve, e.to_string(), 0);
                return;
            }
        };
        let duration_ms = resolved
            .duration_seconds
            .map_or(0, |seconds| seconds.saturating_mul(1000));

        let transport = match self.transports.create_audio(&resolved.url, self.volume) {
            Ok(transport) => transport,
            Err(e) => {
                self.handle_load_failure(FailurePhase::Create, e.to_string(), duration_ms);
                return;
            }
        };

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let started = session
            .attach_audio(transport, duration_ms)
            .and_then(|_| session.start());
        match started {
            Ok(()) => {
                let track = session.track().clone();
                info!(
                    track_id = %track.id,
                    attempt_id,
                    duration_ms = session.duration_ms(),
                    "Playback started"
                );
                self.emit(CoreEvent::Playback(PlaybackEvent::Started {
                    track_id: track.id,
                    title: track.title,
                    degraded: false,
                }));
            }
            Err(e) => self.handle_load_failure(FailurePhase::Play, e.to_string(), duration_ms),
        }
    }

    /// Resolve, create or initial-play failure: simulated playback when
    /// allowed, `Error` otherwise.
    fn handle_load_failure(&mut self, phase: FailurePhase, message: String, duration_ms: u64) {
        let degraded_fallback = self.config.degraded_fallback;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let track = session.track().clone();
        error!(
            track_id = %track.id,
            attempt_id = session.attempt_id(),
            phase = %phase,
            error = %message,
            "Track load failed"
        );

        if !degraded_fallback {
            self.fail_session(phase, message);
            return;
        }

        let duration_ms = if duration_ms > 0 {
            duration_ms
        } else {
            session.duration_ms()
        };
        let transport = self.transports.simulated(duration_ms, self.volume);
        let started = session
            .attach_audio(transport, duration_ms)
            .and_then(|_| session.start());
        if let Err(e) = started {
            self.fail_session(phase, e.to_string());
            return;
        }

        warn!(track_id = %track.id, duration_ms, "Falling back to simulated playback");
        self.emit(CoreEvent::Playback(PlaybackEvent::Degraded {
            track_id: track.id.clone(),
            phase: phase.to_string(),
            message,
        }));
        self.emit(CoreEvent::Playback(PlaybackEvent::Started {
            track_id: track.id,
            title: track.title,
            degraded: true,
        }));
    }

    /// Moves the current session to `Error`. Navigation or play/pause retries.
    fn fail_session(&mut self, phase: FailurePhase, message: String) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let track_id = session.track().id.clone();
        error!(track_id = %track_id, phase = %phase, error = %message, "Playback failed");
        session.fail(message.clone());
        self.emit(CoreEvent::Playback(PlaybackEvent::Error {
            track_id: Some(track_id),
            phase: phase.to_string(),
            message,
            recoverable: true,
        }));
    }

    // ------------------------------------------------------------------------
    // Video
    // ------------------------------------------------------------------------

    fn request_video(&mut self) {
        let Some(track_id) = self.session.as_ref().map(|s| s.track().id.clone()) else {
            return;
        };

        if !self.transports.has_engine() {
            debug!(track_id = %track_id, "No media engine, video unavailable");
            self.emit(CoreEvent::Video(VideoEvent::Unavailable {
                track_id,
                message: "no media engine configured".to_string(),
            }));
            return;
        }

        let attempt_id = self.next_attempt_id();
        let Some(cancel) = self
            .session
            .as_mut()
            .map(|session| session.request_video(attempt_id))
        else {
            return;
        };
        debug!(track_id = %track_id, attempt_id, "Resolving video");

        let resolver = self.resolver.clone();
        let tx = self.tx.clone();
        core_async::spawn(async move {
            let result = core_async::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = resolver.resolve_video(&track_id) => Some(result),
            };
            match result {
                Some(result) => {
                    let _ = tx.send(ControlMessage::VideoResolved {
                        attempt_id,
                        track_id,
                        result,
                    });
                }
                None => debug!(track_id = %track_id, attempt_id, "Video resolution cancelled"),
            }
        });
    }

    fn on_video_resolved(
        &mut self,
        attempt_id: u64,
        track_id: &str,
        result: Result<ResolvedVideo>,
    ) {
        let current = self.video_enabled
            && self
                .session
                .as_ref()
                .is_some_and(|s| s.video_attempt() == Some(attempt_id));
        if !current {
            debug!(track_id, attempt_id, "Discarding stale video resolution");
            return;
        }

        let video = result.and_then(|resolved| {
            self.transports
                .create_video(&resolved.url)
                .map_err(|e| PlaybackError::TransportCreateFailure {
                    track_id: track_id.to_string(),
                    message: e.to_string(),
                })
        });

        match video {
            Ok(video) => {
                let now_ms = self.clock.now_ms();
                let grace_ms = self.config.video_ready_grace_ms();
                if let Some(session) = self.session.as_mut() {
                    session.attach_video(video, now_ms, grace_ms);
                }
                info!(track_id, attempt_id, "Video attached");
                self.emit(CoreEvent::Video(VideoEvent::Attached {
                    track_id: track_id.to_string(),
                }));
            }
            Err(e) => {
                let phase = e.phase().unwrap_or(FailurePhase::Resolve);
                warn!(track_id, phase = %phase, error = %e, "Video unavailable");
                self.drop_video(track_id, e.to_string());
            }
        }
    }

    /// Detaches the video for this track and reports it unavailable. The
    /// preference stays on so the next track tries again.
    fn drop_video(&mut self, track_id: &str, message: String) {
        if let Some(session) = self.session.as_mut() {
            session.detach_video();
        }
        self.emit(CoreEvent::Video(VideoEvent::Unavailable {
            track_id: track_id.to_string(),
            message,
        }));
    }

    fn report_sync_action(&self, track_id: &str, action: SyncAction) {
        match action {
            SyncAction::DriftCorrected { drift_ms, .. } => {
                info!(track_id, drift_ms, "Video drift corrected");
                self.emit(CoreEvent::Video(VideoEvent::DriftCorrected {
                    track_id: track_id.to_string(),
                    drift_ms,
                }));
            }
            SyncAction::Resynced { position_ms } => {
                self.emit(CoreEvent::Video(VideoEvent::Resynced {
                    track_id: track_id.to_string(),
                    position_ms,
                }));
            }
            SyncAction::None | SyncAction::Waiting => {}
        }
    }

    // ------------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------------

    fn on_progress_tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match self.ticker.tick(session) {
            TickOutcome::Idle | TickOutcome::Progress { .. } => {}
            TickOutcome::Completed { position_ms } => {
                debug!(track_id = %session.track().id, position_ms, "End of track reached");
                self.on_track_completed();
            }
            TickOutcome::Failed { message } => self.fail_session(FailurePhase::Play, message),
        }
    }

    fn on_track_completed(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.mark_ended();
        let track_id = session.track().id.clone();
        info!(track_id = %track_id, "Track completed");
        self.emit(CoreEvent::Playback(PlaybackEvent::Completed {
            track_id: track_id.clone(),
        }));

        if self.playlist.is_repeat_enabled() {
            self.load_current();
            return;
        }

        if self
            .playlist
            .advance(self.config.wrap_on_natural_end)
            .is_some()
        {
            self.load_current();
            return;
        }

        // End of queue: keep the session around as `Ended` without handles.
        if let Some(session) = self.session.as_mut() {
            session.release();
        }
        info!(track_id = %track_id, "End of playlist");
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped { track_id }));
    }

    fn on_sync_tick(&mut self) {
        let now_ms = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.has_video() {
            return;
        }
        let track_id = session.track().id.clone();

        if session.video_failed() {
            warn!(track_id = %track_id, "Video engine reported an error");
            self.drop_video(&track_id, "video playback failed".to_string());
            return;
        }

        match session.sync_video(&self.sync, now_ms) {
            Ok(action) => self.report_sync_action(&track_id, action),
            Err(e) => {
                warn!(track_id = %track_id, error = %e, "Video sync failed");
                self.drop_video(&track_id, e.to_string());
            }
        }
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is not an error.
        let _ = self.events.emit(event);
    }
}
