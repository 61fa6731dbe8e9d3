//! Shared, interval-refreshed `qstat`-style queue snapshot (spec §4.3,
//! "one external command shared across N handlers per queueStatInterval").
//!
//! Every `GridTaskHandler` tracking the same executor holds a clone of the
//! same `Arc<QueueStatusCache<G>>`; whichever handler polls first after the
//! interval elapses pays for the refresh, the rest read the cached map.

use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::warn;

use crate::status::{QueueStatus, QueueStatusMap};
use crate::GridExecutor;

struct CacheInner {
    map: QueueStatusMap,
    last_refreshed: Option<Instant>,
}

pub struct QueueStatusCache<G> {
    executor: G,
    queue: Option<String>,
    interval: Duration,
    inner: Mutex<CacheInner>,
}

impl<G: GridExecutor> QueueStatusCache<G> {
    pub fn new(executor: G, queue: Option<String>, interval: Duration) -> Self {
        Self {
            executor,
            queue,
            interval,
            inner: Mutex::new(CacheInner { map: QueueStatusMap::new(), last_refreshed: None }),
        }
    }

    /// Return the last-seen status for `job_id`, refreshing the shared
    /// snapshot first if `interval` has elapsed since the last refresh.
    pub async fn status_of(&self, job_id: &str) -> Option<QueueStatus> {
        self.maybe_refresh().await;
        let inner = self.inner.lock().await;
        inner.map.get(job_id).copied()
    }

    async fn maybe_refresh(&self) {
        {
            let inner = self.inner.lock().await;
            if inner.last_refreshed.is_some_and(|t| t.elapsed() < self.interval) {
                return;
            }
        }

        let argv = self.executor.queue_status_command(self.queue.as_deref());
        let Some((program, args)) = argv.split_first() else {
            return;
        };
        let output = Command::new(program).args(args).output().await;

        let mut inner = self.inner.lock().await;
        // Re-check under lock: another handler may have refreshed meanwhile.
        if inner.last_refreshed.is_some_and(|t| t.elapsed() < self.interval) {
            return;
        }
        match output {
            Ok(out) => {
                let text = String::from_utf8_lossy(&out.stdout);
                inner.map = self.executor.parse_queue_status(&text);
            }
            Err(e) => {
                warn!(error = %e, "queue status command failed; keeping stale snapshot");
            }
        }
        inner.last_refreshed = Some(Instant::now());
    }
}
