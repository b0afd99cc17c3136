use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::manager::RequestLifecycle;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(83);
const DEFAULT_BATCH_SIZE: usize = 20;

/// Periodically reaps requests whose owning client process has exited.
/// Each pass checks at most `batch_size` tracked pids against `/proc`.
pub struct GarbageCollector {
    lifecycle: Arc<RequestLifecycle>,
    interval: Duration,
    batch_size: usize,
    proc_root: PathBuf,
}

impl GarbageCollector {
    pub fn new(lifecycle: Arc<RequestLifecycle>) -> Self {
        GarbageCollector {
            lifecycle,
            interval: DEFAULT_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            proc_root: PathBuf::from("/proc"),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_proc_root(mut self, proc_root: impl Into<PathBuf>) -> Self {
        self.proc_root = proc_root.into();
        self
    }

    /// Run forever, sleeping `interval` between passes.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.pass();
        }
    }

    /// Run a single pass and return the number of dead clients reaped.
    pub fn pass(&self) -> usize {
        let mut reaped = 0;
        for pid in self.lifecycle.tracked_pids().into_iter().take(self.batch_size) {
            if !self.proc_root.join(pid.to_string()).exists() {
                self.lifecycle.client_died(pid);
                reaped += 1;
            }
        }
        if reaped > 0 {
            info!(reaped, "garbage collector reaped dead clients");
        }
        reaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::AlwaysVerified;
    use crate::queue::RequestQueue;
    use restuned_types::{Priority, Request, RequestType, INDEFINITE};

    fn sample(pid: i32) -> Request {
        Request::new(0, RequestType::ResourceTune, Priority::SystemHigh, INDEFINITE, pid, pid, vec![])
    }

    #[test]
    fn reaps_pid_missing_from_proc_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("1111")).unwrap();

        let queue = Arc::new(RequestQueue::new(8));
        let lifecycle = Arc::new(RequestLifecycle::new(queue));
        lifecycle.submit(sample(1111), true, &AlwaysVerified).unwrap();
        lifecycle.submit(sample(2222), true, &AlwaysVerified).unwrap();

        let gc = GarbageCollector::new(lifecycle.clone()).with_proc_root(dir.path());
        let reaped = gc.pass();

        assert_eq!(reaped, 1);
    }
}
