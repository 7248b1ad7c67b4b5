//! Async runtime facade for the media player core.
//!
//! Every core crate goes through this crate instead of naming tokio directly,
//! so the executor choice stays in one place.
//!
//! # Modules
//!
//! - `task`: task spawning and join handles
//! - `time`: sleep, intervals, timeouts, `Instant`
//! - `sync`: channels, locks and [`CancellationToken`](sync::CancellationToken)
//! - `periodic`: cancellable fixed-cadence tasks
//! - `runtime`: runtime construction and `block_on`
//!
//! # Examples
//!
//! ```rust
//! use core_async::periodic::PeriodicTask;
//! use core_async::sync::CancellationToken;
//! use core_async::time::Duration;
//!
//! # async fn example() {
//! let token = CancellationToken::new();
//! let task = PeriodicTask::spawn("heartbeat", Duration::from_millis(250), token, || {
//!     // returning false stops the task
//!     true
//! });
//! task.cancel();
//! # }
//! ```

pub mod periodic;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use periodic::PeriodicTask;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};

/// Waits on several futures, running the branch of whichever finishes first.
pub use tokio::select;
