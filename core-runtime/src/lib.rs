//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the media player core:
//! - Configuration and bridge wiring
//! - Logging and tracing infrastructure
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its configuration type,
//! its logging conventions and the broadcast channel used to publish
//! playback events.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, FeatureFlags};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
