//! Workspace placeholder crate.
//!
//! Re-exports the individual workspace crates (`bridge-traits`, `core-runtime`,
//! `core-playback`) under one dependency so host applications embedding the
//! player can wire the core without naming each crate.

pub use bridge_traits as bridge;
pub use core_playback as playback;
pub use core_runtime as runtime;

pub use core_playback::{PlaybackSnapshot, PlaybackStatus, Player, Track};
pub use core_runtime::config::CoreConfig;
