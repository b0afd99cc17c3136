use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

use restuned_types::{Priority, Request};

const PRIORITY_LEVELS: [Priority; 6] = [
    Priority::ServerCleanup,
    Priority::HighTransfer,
    Priority::SystemHigh,
    Priority::SystemLow,
    Priority::ThirdPartyHigh,
    Priority::ThirdPartyLow,
];

fn level_index(priority: Priority) -> usize {
    PRIORITY_LEVELS.iter().position(|p| *p == priority).expect("priority enum is exhaustively listed above")
}

/// Bounded, priority-ordered intake queue drained by a single worker.
/// Within a priority level ordering is FIFO; across levels, stronger
/// priorities always drain first. Each level has its own capacity; a push
/// against a full level evicts that level's oldest entry first.
pub struct RequestQueue {
    levels: Mutex<[VecDeque<Request>; 6]>,
    capacity_per_level: usize,
    notify: Notify,
}

impl RequestQueue {
    pub fn new(capacity_per_level: usize) -> Self {
        RequestQueue {
            levels: Mutex::new(Default::default()),
            capacity_per_level,
            notify: Notify::new(),
        }
    }

    pub fn enqueue(&self, request: Request) {
        let idx = level_index(request.priority);
        {
            let mut levels = self.levels.lock();
            if levels[idx].len() >= self.capacity_per_level {
                if let Some(dropped) = levels[idx].pop_front() {
                    warn!(handle = dropped.handle, priority = ?dropped.priority, "request queue overflow, dropping oldest");
                }
            }
            levels[idx].push_back(request);
        }
        self.notify.notify_one();
    }

    /// Pop the oldest request from the strongest non-empty priority level,
    /// waiting if the queue is currently empty.
    pub async fn dequeue(&self) -> Request {
        loop {
            if let Some(req) = self.try_dequeue() {
                return req;
            }
            self.notify.notified().await;
        }
    }

    pub fn try_dequeue(&self) -> Option<Request> {
        let mut levels = self.levels.lock();
        levels.iter_mut().find_map(|level| level.pop_front())
    }

    pub fn len(&self) -> usize {
        self.levels.lock().iter().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
