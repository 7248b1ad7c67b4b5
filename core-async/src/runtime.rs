//! Runtime utilities.
//!
//! Hosts that do not already run tokio can build a runtime here, or drive a
//! single future to completion with [`block_on`].

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be built (for example when the OS refuses to
/// create the timer driver).
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}
