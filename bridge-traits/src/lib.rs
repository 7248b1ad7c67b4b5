//! # Host Bridge Traits
//!
//! Capability traits the host application implements for the playback core.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and the host. Each
//! trait represents something the core needs but does not own: resolving
//! catalogue entries to playable URLs, driving a native media engine, telling
//! time and forwarding logs.
//!
//! ## Traits
//!
//! ### Media
//! - [`StreamResolver`](resolver::StreamResolver) - Track id to playable audio/video URL
//! - [`MediaEngine`](media::MediaEngine) - Creates native playback handles
//! - [`MediaHandle`](media::MediaHandle) - One native playback instance
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Monotonic time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! A stream resolver is required. The media engine is optional: without one the
//! core falls back to simulated playback and never attaches video.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .stream_resolver(resolver)
//!     .media_engine(engine)
//!     .build()?; // CapabilityMissing if no resolver was given
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should convert platform errors to `BridgeError` and keep
//! messages actionable.
//!
//! ## Thread Safety
//!
//! Shared capabilities (`StreamResolver`, `MediaEngine`, `Clock`,
//! `LoggerSink`) are `Send + Sync`. A [`MediaHandle`](media::MediaHandle) is
//! only `Send`: it is owned by a single task at a time.

pub mod error;
pub mod media;
pub mod resolver;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use media::{EngineState, MediaEngine, MediaHandle, MediaKind, MediaRequest};
pub use resolver::{ResolvedAudio, ResolvedVideo, StreamResolver};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
