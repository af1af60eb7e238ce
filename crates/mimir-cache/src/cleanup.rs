//! Periodic removal of expired entries.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, spawn};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use crate::Cache;

/// Background task that calls [`Cache::cleanup`] on a fixed interval.
///
/// The task runs until [`CleanupTask::stop`] is awaited. Dropping the handle
/// without stopping aborts the task.
pub struct CleanupTask {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CleanupTask {
    /// Start sweeping `cache` every `interval`, first sweep one interval from now
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(cache: Arc<dyn Cache>, interval: Duration) -> Self {
        let period = interval.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.cleanup().await;
                        if removed > 0 {
                            debug!(removed, "removed expired cache entries");
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
            debug!("cache cleanup task stopped");
        });

        debug!(interval_ms = period.as_millis(), "cache cleanup task started");
        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Whether the background task is still running
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the task to stop and wait for it to finish
    ///
    /// A sweep already in progress completes first.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take()
            && shutdown.send(()).is_err()
        {
            debug!("cache cleanup task had already exited");
        }
        if let Some(handle) = self.handle.take()
            && let Err(error) = handle.await
        {
            warn!("cache cleanup task ended abnormally: {error}");
        }
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test code is allowed to use unwrap and has different conventions"
)]
mod tests {
    use super::*;
    use crate::MemoryCache;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_start_and_stop() {
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::default());
        let task = CleanupTask::start(Arc::clone(&cache), Duration::from_millis(10));
        assert!(task.is_running());
        task.stop().await;
    }

    #[tokio::test]
    async fn test_drop_aborts_task() {
        let cache = Arc::new(MemoryCache::default());
        let shared: Arc<dyn Cache> = Arc::<MemoryCache>::clone(&cache);
        let task = CleanupTask::start(shared, Duration::from_millis(10));
        drop(task);
        // The task held the only other reference to the cache
        sleep(Duration::from_millis(50)).await;
        assert_eq!(Arc::strong_count(&cache), 1);
    }
}
