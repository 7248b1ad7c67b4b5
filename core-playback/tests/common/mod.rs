//! Shared fakes for the playback integration tests.
//!
//! - [`FakeMediaEngine`] hands out handles whose state lives behind a shared
//!   lock, so tests can move positions, flip engine states and inspect the
//!   exact call sequence.
//! - [`ScriptedResolver`] answers per track id.
//! - [`Harness`] drives a [`PlaybackEngine`] message by message.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    Clock, EngineState, ManualClock, MediaEngine, MediaHandle, MediaKind, MediaRequest,
    ResolvedAudio, ResolvedVideo, StreamResolver,
};
use core_playback::engine::{Command, ControlMessage, PlaybackEngine};
use core_playback::{PlaybackConfig, PlaylistController, Result, Track};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Media engine
// ============================================================================

#[derive(Debug)]
pub struct HandleState {
    pub id: usize,
    pub kind: MediaKind,
    pub url: String,
    pub muted: bool,
    pub volume: f32,
    pub strip_audio: bool,
    pub position_ms: u64,
    pub state: EngineState,
    pub calls: Vec<String>,
    pub released: bool,
    pub fail_play: bool,
}

pub type SharedHandle = Arc<Mutex<HandleState>>;

#[derive(Default)]
pub struct FakeMediaEngine {
    handles: Mutex<Vec<SharedHandle>>,
    /// Engine-wide ordered log of `create:<id>:<kind>` and `release:<id>`.
    journal: Arc<Mutex<Vec<String>>>,
    reject_kinds: Mutex<HashSet<MediaKind>>,
    fail_play_kinds: Mutex<HashSet<MediaKind>>,
}

impl FakeMediaEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `create` fails for this kind.
    pub fn reject(&self, kind: MediaKind) {
        self.reject_kinds.lock().insert(kind);
    }

    /// Handles of this kind fail their first `play`.
    pub fn fail_play(&self, kind: MediaKind) {
        self.fail_play_kinds.lock().insert(kind);
    }

    pub fn handles(&self) -> Vec<SharedHandle> {
        self.handles.lock().clone()
    }

    pub fn handles_of(&self, kind: MediaKind) -> Vec<SharedHandle> {
        self.handles
            .lock()
            .iter()
            .filter(|h| h.lock().kind == kind)
            .cloned()
            .collect()
    }

    pub fn last_of(&self, kind: MediaKind) -> SharedHandle {
        self.handles_of(kind)
            .pop()
            .unwrap_or_else(|| panic!("no {kind:?} handle created"))
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    /// Handles that have not been released.
    pub fn live_handles(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|h| !h.lock().released)
            .count()
    }
}

impl MediaEngine for FakeMediaEngine {
    fn create(&self, request: &MediaRequest) -> BridgeResult<Box<dyn MediaHandle>> {
        if self.reject_kinds.lock().contains(&request.kind) {
            return Err(BridgeError::OperationFailed(format!(
                "cannot open {:?}",
                request.kind
            )));
        }

        let mut handles = self.handles.lock();
        let id = handles.len();
        let state = Arc::new(Mutex::new(HandleState {
            id,
            kind: request.kind,
            url: request.url.clone(),
            muted: request.muted,
            volume: request.volume,
            strip_audio: request.strip_audio,
            position_ms: 0,
            state: EngineState::Opening,
            calls: Vec::new(),
            released: false,
            fail_play: self.fail_play_kinds.lock().contains(&request.kind),
        }));
        handles.push(Arc::clone(&state));
        self.journal
            .lock()
            .push(format!("create:{id}:{:?}", request.kind));

        Ok(Box::new(FakeHandle {
            state,
            journal: Arc::clone(&self.journal),
        }))
    }
}

struct FakeHandle {
    state: SharedHandle,
    journal: Arc<Mutex<Vec<String>>>,
}

impl MediaHandle for FakeHandle {
    fn play(&mut self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push("play".into());
        if state.fail_play {
            state.fail_play = false;
            return Err(BridgeError::OperationFailed("decoder refused".into()));
        }
        state.state = EngineState::Playing;
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push("pause".into());
        state.state = EngineState::Paused;
        Ok(())
    }

    fn stop(&mut self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push("stop".into());
        if !state.state.is_ended() && !state.state.is_error() {
            state.state = EngineState::Stopped;
        }
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("seek:{position_ms}"));
        state.position_ms = position_ms;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("volume:{}", (volume * 100.0).round() as u32));
        state.volume = volume;
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("muted:{muted}"));
        state.muted = muted;
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.state.lock().position_ms
    }

    fn state(&self) -> EngineState {
        self.state.lock().state
    }

    fn release(&mut self) {
        let mut state = self.state.lock();
        state.calls.push("release".into());
        state.released = true;
        self.journal.lock().push(format!("release:{}", state.id));
    }
}

/// Calls recorded on a handle, without the mute/volume setup.
pub fn transport_calls(handle: &SharedHandle) -> Vec<String> {
    handle
        .lock()
        .calls
        .iter()
        .filter(|c| !c.starts_with("volume:") && !c.starts_with("muted:"))
        .cloned()
        .collect()
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves every track to `https://cdn.test/<id>.<ext>?sig=...` unless told
/// otherwise.
#[derive(Default)]
pub struct ScriptedResolver {
    audio_failures: Mutex<HashSet<String>>,
    stalled: Mutex<HashSet<String>>,
    abandoned: Arc<AtomicUsize>,
    video_failures: Mutex<HashSet<String>>,
    durations: Mutex<HashMap<String, u64>>,
    audio_calls: Mutex<Vec<String>>,
    video_calls: Mutex<Vec<String>>,
}

impl ScriptedResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_audio(&self, track_id: &str) {
        self.audio_failures.lock().insert(track_id.to_string());
    }

    /// Audio resolution for `track_id` never completes.
    pub fn stall_audio(&self, track_id: &str) {
        self.stalled.lock().insert(track_id.to_string());
    }

    /// Stalled resolutions whose future was dropped before completing.
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    pub fn fail_video(&self, track_id: &str) {
        self.video_failures.lock().insert(track_id.to_string());
    }

    /// Duration the resolver reports for `track_id`.
    pub fn duration(&self, track_id: &str, seconds: u64) {
        self.durations.lock().insert(track_id.to_string(), seconds);
    }

    pub fn audio_calls(&self) -> Vec<String> {
        self.audio_calls.lock().clone()
    }

    pub fn video_calls(&self) -> Vec<String> {
        self.video_calls.lock().clone()
    }
}

#[async_trait]
impl StreamResolver for ScriptedResolver {
    async fn resolve_audio(&self, track_id: &str) -> BridgeResult<ResolvedAudio> {
        self.audio_calls.lock().push(track_id.to_string());
        let stalled = self.stalled.lock().contains(track_id);
        if stalled {
            let _guard = AbandonGuard(Arc::clone(&self.abandoned));
            return std::future::pending().await;
        }
        if self.audio_failures.lock().contains(track_id) {
            return Err(BridgeError::OperationFailed(format!(
                "extraction failed for {track_id}"
            )));
        }
        Ok(ResolvedAudio {
            url: format!("https://cdn.test/{track_id}.m4a?sig=secret"),
            duration_seconds: self.durations.lock().get(track_id).copied(),
        })
    }

    async fn resolve_video(&self, track_id: &str) -> BridgeResult<ResolvedVideo> {
        self.video_calls.lock().push(track_id.to_string());
        if self.video_failures.lock().contains(track_id) {
            return Err(BridgeError::NotAvailable(format!("no video for {track_id}")));
        }
        Ok(ResolvedVideo {
            url: format!("https://cdn.test/{track_id}.mp4?sig=secret"),
        })
    }
}

/// Counts a stalled resolution as abandoned when its future is dropped.
struct AbandonGuard(Arc<AtomicUsize>);

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Engine harness
// ============================================================================

pub fn tracks(entries: &[(&str, u64)]) -> Vec<Track> {
    entries
        .iter()
        .map(|(id, seconds)| Track::new(*id, id.to_uppercase()).with_duration_seconds(*seconds))
        .collect()
}

pub struct Harness {
    pub engine: PlaybackEngine,
    pub rx: mpsc::UnboundedReceiver<ControlMessage>,
    pub clock: Arc<ManualClock>,
    pub resolver: Arc<ScriptedResolver>,
    pub media: Option<Arc<FakeMediaEngine>>,
    events: EventStream,
}

impl Harness {
    pub fn new(media: Option<Arc<FakeMediaEngine>>, config: PlaybackConfig) -> Self {
        Self::with_resolver(ScriptedResolver::new(), media, config)
    }

    pub fn with_resolver(
        resolver: Arc<ScriptedResolver>,
        media: Option<Arc<FakeMediaEngine>>,
        config: PlaybackConfig,
    ) -> Self {
        let clock = Arc::new(ManualClock::starting_at(10_000));
        let mut builder = CoreConfig::builder()
            .stream_resolver(resolver.clone())
            .clock(clock.clone());
        if let Some(media) = &media {
            builder = builder.media_engine(media.clone());
        }
        let core = builder.build().expect("valid core config");

        let bus = EventBus::new(256);
        let events = EventStream::new(bus.subscribe());
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = PlaybackEngine::new(
            &core,
            config,
            PlaylistController::with_seed(42),
            bus,
            tx,
        );

        Self {
            engine,
            rx,
            clock,
            resolver,
            media,
            events,
        }
    }

    pub fn media(&self) -> &FakeMediaEngine {
        self.media.as_deref().expect("harness has a media engine")
    }

    pub fn command(&mut self, command: Command) -> ControlFlow<()> {
        self.engine.handle_message(ControlMessage::Command(command))
    }

    pub fn play(&mut self, tracks: &[Track], index: usize) -> Result<()> {
        let track = tracks
            .get(index)
            .cloned()
            .unwrap_or_else(|| Track::new("missing", "Missing"));
        self.play_track(track, tracks.to_vec(), index)
    }

    pub fn play_track(&mut self, track: Track, playlist: Vec<Track>, index: usize) -> Result<()> {
        let (reply, mut response) = oneshot::channel();
        self.command(Command::Play {
            track,
            playlist,
            index,
            reply,
        });
        response.try_recv().expect("play replies synchronously")
    }

    /// Handles every resolution posted so far, including ones the handled
    /// messages trigger.
    pub async fn settle(&mut self) {
        let mut idle_rounds = 0;
        while idle_rounds < 5 {
            tokio::task::yield_now().await;
            match self.rx.try_recv() {
                Ok(message) => {
                    idle_rounds = 0;
                    let _ = self.engine.handle_message(message);
                }
                Err(_) => idle_rounds += 1,
            }
        }
    }

    /// Waits for the next posted message without handling it.
    pub async fn next_message(&mut self) -> ControlMessage {
        self.rx.recv().await.expect("engine keeps a sender")
    }

    pub fn progress_tick(&mut self) {
        let _ = self.engine.handle_message(ControlMessage::ProgressTick);
    }

    pub fn sync_tick(&mut self) {
        let _ = self.engine.handle_message(ControlMessage::SyncTick);
    }

    pub fn advance(&self, ms: u64) {
        self.clock.advance(ms);
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn current_id(&self) -> Option<String> {
        self.engine.playlist().current_track().map(|t| t.id.clone())
    }

    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(Ok(event)) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
