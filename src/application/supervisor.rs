//! Supervised group of periodic background tasks.
//!
//! Every task loops on its own interval until the group's shutdown flag
//! flips. A tick that panics is logged and the loop carries on with the next
//! tick. [`TaskGroup::shutdown`] waits for every task to finish.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Handles to a set of periodic tasks sharing one shutdown signal.
pub struct TaskGroup {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl TaskGroup {
    #[must_use]
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Run `tick` every `period` until shutdown.
    ///
    /// The first tick fires one full period after spawning.
    pub fn spawn_periodic<F, Fut>(&mut self, name: &'static str, period: Duration, tick: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;
            debug!(task = name, period_ms = period.as_millis() as u64, "Task started");

            loop {
                tokio::select! {
                    result = shutdown.changed() => {
                        if result.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if AssertUnwindSafe(tick()).catch_unwind().await.is_err() {
                            error!(task = name, "Task tick panicked, continuing");
                        }
                    }
                }
            }
            debug!(task = name, "Task stopped");
        });
        self.tasks.push((name, handle));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Names of the spawned tasks, in spawn order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|(name, _)| *name).collect()
    }

    /// Signal shutdown and wait for every task to exit.
    pub async fn shutdown(self) {
        // Only fails when no task holds a receiver, i.e. every task is gone.
        let _ = self.shutdown.send(true);
        let count = self.tasks.len();
        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "Task ended abnormally");
            }
        }
        info!(tasks = count, "Background tasks stopped");
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Poll until `count` reaches `at_least`, failing after a generous deadline.
    async fn wait_for(count: &AtomicU32, at_least: u32) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while count.load(Ordering::SeqCst) < at_least {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(
            waited.is_ok(),
            "expected {at_least} ticks, saw {}",
            count.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn ticks_until_shutdown() {
        let count = Arc::new(AtomicU32::new(0));
        let mut group = TaskGroup::new();
        let counter = count.clone();
        group.spawn_periodic("count", Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(group.len(), 1);

        wait_for(&count, 2).await;
        group.shutdown().await;
        let seen = count.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn panicking_tick_does_not_stop_the_task() {
        let count = Arc::new(AtomicU32::new(0));
        let mut group = TaskGroup::new();
        let counter = count.clone();
        group.spawn_periodic("flaky", Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first tick fails");
                }
            }
        });

        wait_for(&count, 2).await;
        group.shutdown().await;
        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn first_tick_waits_one_period() {
        let count = Arc::new(AtomicU32::new(0));
        let mut group = TaskGroup::new();
        let counter = count.clone();
        group.spawn_periodic("slow", Duration::from_secs(60), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        group.shutdown().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
