use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;

use restuned_types::Handle;

/// Per-request expiry timers. Each tracked request owns at most one timer;
/// rearming (duration update) tears down the old one and starts a fresh one,
/// matching the source's destroy-then-recreate update path.
#[derive(Default)]
pub struct TimerWheel {
    timers: DashMap<Handle, JoinHandle<()>>,
}

impl TimerWheel {
    pub fn new() -> Arc<Self> {
        Arc::new(TimerWheel::default())
    }

    /// Arm a timer for `handle`. `on_fire` runs once, after `duration`,
    /// unless the timer is cancelled or rearmed first. Fire does not touch
    /// CCT state directly — it only calls back into the lifecycle engine.
    pub fn arm<F>(self: &Arc<Self>, handle: Handle, duration: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel(handle);
        let wheel = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            wheel.timers.remove(&handle);
            on_fire();
        });
        self.timers.insert(handle, task);
    }

    /// Tear down then immediately re-arm with a new duration.
    pub fn rearm<F>(self: &Arc<Self>, handle: Handle, duration: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.arm(handle, duration, on_fire);
    }

    /// Cancel a timer before it fires, e.g. on explicit untune. Returns
    /// whether a timer was actually cancelled.
    pub fn cancel(&self, handle: Handle) -> bool {
        if let Some((_, task)) = self.timers.remove(&handle) {
            task.abort();
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self, handle: Handle) -> bool {
        self.timers.contains_key(&handle)
    }

    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }
}
