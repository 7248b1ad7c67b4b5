//! Cancellable fixed-cadence tasks.
//!
//! A [`PeriodicTask`] runs a callback every `period` until its
//! [`CancellationToken`] fires, the callback returns `false`, or the task
//! handle is dropped. The first tick happens one full period after spawning.
//!
//! The callback runs on the spawned task, not on the caller's task. Callers
//! that own single-threaded state should make the callback enqueue a message
//! for the owning task rather than touch that state directly.

use crate::sync::CancellationToken;
use crate::task::JoinHandle;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Handle to a running periodic task.
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawns `on_tick` every `period` on the current runtime.
    ///
    /// A zero period is raised to one millisecond.
    pub fn spawn<F>(
        name: &'static str,
        period: Duration,
        token: CancellationToken,
        mut on_tick: F,
    ) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(
                task = name,
                period_ms = period.as_millis() as u64,
                "Periodic task started"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        trace!(task = name, "tick");
                        if !on_tick() {
                            break;
                        }
                    }
                }
            }

            debug!(task = name, "Periodic task stopped");
        });

        Self {
            name,
            period,
            token,
            handle,
        }
    }

    /// Name used in log output.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Tick cadence.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns `true` once the task loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the task. No tick is delivered after this returns.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ticks_at_cadence_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let task = PeriodicTask::spawn(
            "test",
            Duration::from_millis(100),
            CancellationToken::new(),
            move || {
                seen.fetch_add(1, Ordering::SeqCst);
                true
            },
        );

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        task.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_returning_false_stops_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let task = PeriodicTask::spawn(
            "one-shot",
            Duration::from_millis(10),
            CancellationToken::new(),
            move || {
                seen.fetch_add(1, Ordering::SeqCst);
                false
            },
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn parent_token_cancels_task() {
        let parent = CancellationToken::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let _task = PeriodicTask::spawn(
            "child",
            Duration::from_millis(50),
            parent.child_token(),
            move || {
                seen.fetch_add(1, Ordering::SeqCst);
                true
            },
        );

        parent.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
