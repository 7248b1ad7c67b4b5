//! # Transports
//!
//! Thin owners of playback handles.
//!
//! ## Overview
//!
//! - [`AudioTransport::Native`] drives a [`MediaHandle`] from the host engine.
//! - [`AudioTransport::Simulated`] advances a virtual position against the
//!   injected [`Clock`] at 1x speed. It stands in when no engine is
//!   configured or when the native load pipeline fails.
//! - [`VideoTransport`] drives a second native handle that is always muted,
//!   at volume zero and audio-stripped.
//!
//! Transports are created by a [`TransportFactory`] that is configured once
//! with the optional engine. Every transport releases its handle on drop, and
//! the session releases explicitly before creating a replacement.

use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{Clock, EngineState, MediaEngine, MediaHandle, MediaRequest};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Native audio
// ============================================================================

/// Audio playing through the host engine.
pub struct NativeTransport {
    handle: Box<dyn MediaHandle>,
    released: bool,
}

impl NativeTransport {
    pub fn new(handle: Box<dyn MediaHandle>) -> Self {
        Self {
            handle,
            released: false,
        }
    }

    fn release(&mut self) {
        if !self.released {
            if let Err(e) = self.handle.stop() {
                debug!(error = %e, "Stop before release failed");
            }
            self.handle.release();
            self.released = true;
        }
    }
}

impl Drop for NativeTransport {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Simulated audio
// ============================================================================

/// Virtual playback clock used when native playback is unavailable.
///
/// Position is `base + (now - started_at)` while playing and `base` while
/// paused, capped at the duration. A zero duration ends immediately.
pub struct SimulatedTransport {
    clock: Arc<dyn Clock>,
    duration_ms: u64,
    base_ms: u64,
    started_at_ms: Option<u64>,
    volume: f32,
}

impl SimulatedTransport {
    pub fn new(clock: Arc<dyn Clock>, duration_ms: u64) -> Self {
        Self {
            clock,
            duration_ms,
            base_ms: 0,
            started_at_ms: None,
            volume: 1.0,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn position_ms(&self) -> u64 {
        let running = self
            .started_at_ms
            .map_or(0, |started| self.clock.elapsed_since(started));
        (self.base_ms + running).min(self.duration_ms)
    }

    fn play(&mut self) {
        if self.started_at_ms.is_none() {
            self.started_at_ms = Some(self.clock.now_ms());
        }
    }

    fn pause(&mut self) {
        self.base_ms = self.position_ms();
        self.started_at_ms = None;
    }

    fn stop(&mut self) {
        self.base_ms = 0;
        self.started_at_ms = None;
    }

    fn seek(&mut self, position_ms: u64) {
        self.base_ms = position_ms.min(self.duration_ms);
        if self.started_at_ms.is_some() {
            self.started_at_ms = Some(self.clock.now_ms());
        }
    }

    fn is_ended(&self) -> bool {
        self.position_ms() >= self.duration_ms
    }
}

// ============================================================================
// Audio transport
// ============================================================================

/// The single audio output of a playback session.
pub enum AudioTransport {
    Native(NativeTransport),
    Simulated(SimulatedTransport),
}

impl fmt::Debug for AudioTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioTransport::Native(t) => f
                .debug_struct("Native")
                .field("released", &t.released)
                .finish(),
            AudioTransport::Simulated(t) => f
                .debug_struct("Simulated")
                .field("duration_ms", &t.duration_ms)
                .field("position_ms", &t.position_ms())
                .finish(),
        }
    }
}

impl AudioTransport {
    pub fn is_simulated(&self) -> bool {
        matches!(self, AudioTransport::Simulated(_))
    }

    pub fn play(&mut self) -> Result<()> {
        match self {
            AudioTransport::Native(t) => t.handle.play(),
            AudioTransport::Simulated(t) => {
                t.play();
                Ok(())
            }
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        match self {
            AudioTransport::Native(t) => t.handle.pause(),
            AudioTransport::Simulated(t) => {
                t.pause();
                Ok(())
            }
        }
    }

    pub fn stop(&mut self) -> Result<()> {
        match self {
            AudioTransport::Native(t) => t.handle.stop(),
            AudioTransport::Simulated(t) => {
                t.stop();
                Ok(())
            }
        }
    }

    pub fn seek(&mut self, position_ms: u64) -> Result<()> {
        match self {
            AudioTransport::Native(t) => t.handle.seek(position_ms),
            AudioTransport::Simulated(t) => {
                t.seek(position_ms);
                Ok(())
            }
        }
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        let volume = volume.clamp(0.0, 1.0);
        match self {
            AudioTransport::Native(t) => t.handle.set_volume(volume),
            AudioTransport::Simulated(t) => {
                t.volume = volume;
                Ok(())
            }
        }
    }

    pub fn position_ms(&self) -> u64 {
        match self {
            AudioTransport::Native(t) => t.handle.position_ms(),
            AudioTransport::Simulated(t) => t.position_ms(),
        }
    }

    /// Natural end of stream. Native transports trust the engine's state
    /// rather than comparing position with duration.
    pub fn is_ended(&self) -> bool {
        match self {
            AudioTransport::Native(t) => t.handle.state().is_ended(),
            AudioTransport::Simulated(t) => t.is_ended(),
        }
    }

    /// The engine gave up on the stream. Never true for simulated playback.
    pub fn has_failed(&self) -> bool {
        match self {
            AudioTransport::Native(t) => t.handle.state().is_error(),
            AudioTransport::Simulated(_) => false,
        }
    }

    pub fn engine_state(&self) -> Option<EngineState> {
        match self {
            AudioTransport::Native(t) => Some(t.handle.state()),
            AudioTransport::Simulated(_) => None,
        }
    }

    /// Stops playback and frees the native handle. Idempotent.
    pub fn release(&mut self) {
        match self {
            AudioTransport::Native(t) => t.release(),
            AudioTransport::Simulated(t) => t.stop(),
        }
    }
}

// ============================================================================
// Video transport
// ============================================================================

/// Silent video overlay. Never audible: created muted at volume zero with
/// the audio track stripped, and both settings are re-applied after
/// creation.
pub struct VideoTransport {
    handle: Box<dyn MediaHandle>,
    paused: bool,
    released: bool,
}

impl fmt::Debug for VideoTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoTransport")
            .field("paused", &self.paused)
            .field("released", &self.released)
            .finish()
    }
}

impl VideoTransport {
    /// Wraps a freshly created handle. The video starts paused.
    pub fn new(mut handle: Box<dyn MediaHandle>) -> Result<Self> {
        handle.set_volume(0.0)?;
        handle.set_muted(true)?;
        Ok(Self {
            handle,
            paused: true,
            released: false,
        })
    }

    pub fn play(&mut self) -> Result<()> {
        self.handle.play()?;
        self.paused = false;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.handle.pause()?;
        self.paused = true;
        Ok(())
    }

    pub fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.handle.seek(position_ms)
    }

    pub fn position_ms(&self) -> u64 {
        self.handle.position_ms()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn has_failed(&self) -> bool {
        self.handle.state().is_error()
    }

    pub fn release(&mut self) {
        if !self.released {
            if let Err(e) = self.handle.stop() {
                debug!(error = %e, "Video stop before release failed");
            }
            self.handle.release();
            self.released = true;
        }
    }
}

impl Drop for VideoTransport {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Builds transports. Configured once with the optional native engine.
#[derive(Clone)]
pub struct TransportFactory {
    engine: Option<Arc<dyn MediaEngine>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TransportFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportFactory")
            .field("has_engine", &self.engine.is_some())
            .finish()
    }
}

impl TransportFactory {
    pub fn new(engine: Option<Arc<dyn MediaEngine>>, clock: Arc<dyn Clock>) -> Self {
        Self { engine, clock }
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    fn engine(&self) -> Result<&Arc<dyn MediaEngine>> {
        self.engine
            .as_ref()
            .ok_or_else(|| BridgeError::NotAvailable("no media engine configured".to_string()))
    }

    /// Opens a native audio transport for a resolved URL.
    pub fn create_audio(&self, url: &str, volume: f32) -> Result<AudioTransport> {
        let handle = self.engine()?.create(&MediaRequest::audio(url, volume))?;
        Ok(AudioTransport::Native(NativeTransport::new(handle)))
    }

    /// Virtual-clock transport for `duration_ms`.
    pub fn simulated(&self, duration_ms: u64, volume: f32) -> AudioTransport {
        let mut transport = SimulatedTransport::new(Arc::clone(&self.clock), duration_ms);
        transport.volume = volume.clamp(0.0, 1.0);
        AudioTransport::Simulated(transport)
    }

    /// Opens a silent video transport for a resolved URL.
    pub fn create_video(&self, url: &str) -> Result<VideoTransport> {
        let handle = self.engine()?.create(&MediaRequest::silent_video(url))?;
        VideoTransport::new(handle).map_err(|e| {
            warn!(error = %e, "Video handle rejected mute settings");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{ManualClock, MediaKind};
    use mockall::{mock, predicate::eq, Sequence};

    mock! {
        Handle {}

        impl MediaHandle for Handle {
            fn play(&mut self) -> Result<()>;
            fn pause(&mut self) -> Result<()>;
            fn stop(&mut self) -> Result<()>;
            fn seek(&mut self, position_ms: u64) -> Result<()>;
            fn set_volume(&mut self, volume: f32) -> Result<()>;
            fn set_muted(&mut self, muted: bool) -> Result<()>;
            fn position_ms(&self) -> u64;
            fn state(&self) -> EngineState;
            fn release(&mut self);
        }
    }

    mock! {
        Engine {}

        impl MediaEngine for Engine {
            fn create(&self, request: &MediaRequest) -> Result<Box<dyn MediaHandle>>;
        }
    }

    fn released_once(handle: &mut MockHandle) {
        handle.expect_stop().times(1).returning(|| Ok(()));
        handle.expect_release().times(1).return_const(());
    }

    #[test]
    fn simulated_advances_with_clock_and_caps_at_duration() {
        let clock = Arc::new(ManualClock::new());
        let factory = TransportFactory::new(None, clock.clone());
        let mut audio = factory.simulated(3_000, 0.5);

        assert!(audio.is_simulated());
        audio.play().unwrap();
        clock.advance(1_200);
        assert_eq!(audio.position_ms(), 1_200);
        assert!(!audio.is_ended());

        audio.pause().unwrap();
        clock.advance(5_000);
        assert_eq!(audio.position_ms(), 1_200, "paused clock stands still");

        audio.play().unwrap();
        clock.advance(2_000);
        assert_eq!(audio.position_ms(), 3_000);
        assert!(audio.is_ended());
        assert!(!audio.has_failed());
    }

    #[test]
    fn simulated_seek_rebases_position() {
        let clock = Arc::new(ManualClock::new());
        let factory = TransportFactory::new(None, clock.clone());
        let mut audio = factory.simulated(10_000, 1.0);

        audio.play().unwrap();
        clock.advance(500);
        audio.seek(7_000).unwrap();
        assert_eq!(audio.position_ms(), 7_000);
        clock.advance(1_000);
        assert_eq!(audio.position_ms(), 8_000);

        audio.seek(60_000).unwrap();
        assert_eq!(audio.position_ms(), 10_000);
    }

    #[test]
    fn simulated_unknown_duration_ends_immediately() {
        let clock = Arc::new(ManualClock::new());
        let mut audio = TransportFactory::new(None, clock).simulated(0, 1.0);
        audio.play().unwrap();
        assert!(audio.is_ended());
    }

    #[test]
    fn native_audio_requests_audible_stream() {
        let mut engine = MockEngine::new();
        engine
            .expect_create()
            .withf(|req| req.kind == MediaKind::Audio && !req.muted && req.volume == 0.8)
            .times(1)
            .returning(|_| {
                let mut handle = MockHandle::new();
                handle.expect_state().return_const(EngineState::Ended);
                released_once(&mut handle);
                Ok(Box::new(handle))
            });

        let factory = TransportFactory::new(Some(Arc::new(engine)), Arc::new(ManualClock::new()));
        let audio = factory.create_audio("https://cdn.example/a.m4a", 0.8).unwrap();

        assert!(!audio.is_simulated());
        assert!(audio.is_ended());
        assert_eq!(audio.engine_state(), Some(EngineState::Ended));
        // dropped here: stop + release exactly once
    }

    #[test]
    fn native_release_is_idempotent() {
        let mut handle = MockHandle::new();
        released_once(&mut handle);

        let mut audio = AudioTransport::Native(NativeTransport::new(Box::new(handle)));
        audio.release();
        audio.release();
    }

    #[test]
    fn factory_without_engine_reports_not_available() {
        let factory = TransportFactory::new(None, Arc::new(ManualClock::new()));
        assert!(!factory.has_engine());
        assert!(matches!(
            factory.create_audio("u", 1.0),
            Err(BridgeError::NotAvailable(_))
        ));
        assert!(factory.create_video("u").is_err());
    }

    #[test]
    fn video_is_created_silent() {
        let mut engine = MockEngine::new();
        engine
            .expect_create()
            .withf(|req| {
                req.kind == MediaKind::Video && req.muted && req.volume == 0.0 && req.strip_audio
            })
            .times(1)
            .returning(|_| {
                let mut seq = Sequence::new();
                let mut handle = MockHandle::new();
                handle
                    .expect_set_volume()
                    .with(eq(0.0))
                    .times(1)
                    .in_sequence(&mut seq)
                    .returning(|_| Ok(()));
                handle
                    .expect_set_muted()
                    .with(eq(true))
                    .times(1)
                    .in_sequence(&mut seq)
                    .returning(|_| Ok(()));
                handle.expect_play().times(1).returning(|| Ok(()));
                released_once(&mut handle);
                Ok(Box::new(handle))
            });

        let factory = TransportFactory::new(Some(Arc::new(engine)), Arc::new(ManualClock::new()));
        let mut video = factory.create_video("https://cdn.example/v.mp4").unwrap();
        assert!(video.is_paused());
        video.play().unwrap();
        assert!(!video.is_paused());
    }

    #[test]
    fn audio_volume_is_clamped() {
        let mut handle = MockHandle::new();
        handle
            .expect_set_volume()
            .with(eq(1.0))
            .times(1)
            .returning(|_| Ok(()));
        released_once(&mut handle);

        let mut audio = AudioTransport::Native(NativeTransport::new(Box::new(handle)));
        audio.set_volume(3.0).unwrap();
    }
}
