//! Pending-subscription retry timer.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Owned handle to the recurring retry task.
///
/// The task is aborted when the handle drops, so the timer can never
/// outlive the client that scheduled it.
pub(crate) struct RetryScheduler {
    handle: JoinHandle<()>,
}

impl RetryScheduler {
    /// Spawn a task invoking `tick` every `period`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn<F>(period: Duration, tick: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval fires immediately.
            timer.tick().await;
            loop {
                timer.tick().await;
                tick();
            }
        });

        Self { handle }
    }
}

impl Drop for RetryScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
