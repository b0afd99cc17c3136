use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

use restuned_types::ProcEvent;

/// Bounded single-priority intake queue between the netlink reader and the
/// classifier worker. Overflow trims from the front, same policy as
/// `RequestQueue` but with one level instead of six — this queue has no
/// priority dimension.
pub struct ClassifierQueue {
    events: Mutex<VecDeque<ProcEvent>>,
    capacity: usize,
    notify: Notify,
}

impl ClassifierQueue {
    pub fn new(capacity: usize) -> Self {
        ClassifierQueue { events: Mutex::new(VecDeque::new()), capacity, notify: Notify::new() }
    }

    pub fn push(&self, event: ProcEvent) {
        {
            let mut events = self.events.lock();
            if events.len() >= self.capacity {
                events.pop_front();
                warn!(capacity = self.capacity, "classifier queue overflow, dropping oldest event");
            }
            events.push_back(event);
        }
        self.notify.notify_one();
    }

    pub async fn pop(&self) -> ProcEvent {
        loop {
            if let Some(event) = self.try_pop() {
                return event;
            }
            self.notify.notified().await;
        }
    }

    pub fn try_pop(&self) -> Option<ProcEvent> {
        self.events.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
