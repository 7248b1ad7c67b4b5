//! Task spawning and execution.
//!
//! Thin re-exports of the tokio task API. Background work in the player
//! (stream resolution, periodic ticks) is always spawned through here.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//!
//! # async fn example() {
//! let handle = task::spawn(async { 42 });
//! assert_eq!(handle.await.unwrap(), 42);
//! # }
//! ```

pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the current tokio runtime.
///
/// The task may run on a different worker thread, so both the future and its
/// output must be `Send + 'static`.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
