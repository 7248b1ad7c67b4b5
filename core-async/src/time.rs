//! Time-related abstractions.
//!
//! Re-exports `tokio::time` for timers and `std::time` for durations and
//! monotonic instants.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! # async fn example() {
//! let start = Instant::now();
//! sleep(Duration::from_millis(10)).await;
//! assert!(start.elapsed() >= Duration::from_millis(10));
//! # }
//! ```

pub use tokio::time::{
    error::Elapsed, interval, sleep, sleep_until, timeout, Interval, MissedTickBehavior, Sleep,
    Timeout,
};

pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
