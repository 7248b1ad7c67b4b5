//! Synchronization primitives.
//!
//! Async-aware locks and channels from `tokio::sync`, plus the
//! `CancellationToken` from `tokio-util` used to stop periodic work.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{mpsc, CancellationToken};
//!
//! # async fn example() {
//! let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
//! tx.send(7).unwrap();
//! assert_eq!(rx.recv().await, Some(7));
//!
//! let token = CancellationToken::new();
//! let child = token.child_token();
//! token.cancel();
//! assert!(child.is_cancelled());
//! # }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Barrier, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard, Semaphore, SemaphorePermit,
};

pub use tokio_util::sync::{CancellationToken, DropGuard};
