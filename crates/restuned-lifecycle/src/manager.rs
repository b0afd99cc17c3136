use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use restuned_types::{DurationMs, Handle, Request, INDEFINITE};

use crate::error::{LifecycleError, Result};
use crate::handle::HandleGenerator;
use crate::queue::RequestQueue;

/// Per-resource admission check run on untrusted (non-internal) submissions.
/// The concrete verifier (opcode/device-mode/permission/bounds checks) is
/// wired in by the daemon; this crate only defines the seam.
pub trait Verifier: Send + Sync {
    fn verify(&self, request: &Request) -> std::result::Result<(), String>;
}

/// A verifier that accepts everything, used for internally-synthesized
/// requests (classifier tunes, GC untunes) which bypass re-verification.
pub struct AlwaysVerified;

impl Verifier for AlwaysVerified {
    fn verify(&self, _request: &Request) -> std::result::Result<(), String> {
        Ok(())
    }
}

#[derive(Clone)]
struct RequestRecord {
    request: Request,
    scheduled_duration: DurationMs,
}

/// Admits, tracks and retires requests. Owns the handle space and the
/// request-manager set of currently-live handles; does not touch the CCT
/// directly — timer fire and GC paths only ever enqueue synthesized
/// untunes, mirroring the source's single-writer boundary around CCT state.
pub struct RequestLifecycle {
    handles: HandleGenerator,
    active: DashMap<Handle, RequestRecord>,
    queue: Arc<RequestQueue>,
}

impl RequestLifecycle {
    pub fn new(queue: Arc<RequestQueue>) -> Self {
        RequestLifecycle { handles: HandleGenerator::new(), active: DashMap::new(), queue }
    }

    pub fn queue(&self) -> &Arc<RequestQueue> {
        &self.queue
    }

    /// Admit a request. When `pre_verified` is false the verifier runs
    /// first; a rejected request still burns the handle it was issued (the
    /// handle is never tracked, so it is not reachable by update/untune).
    pub fn submit(&self, mut request: Request, pre_verified: bool, verifier: &dyn Verifier) -> Result<Handle> {
        let handle = self.handles.issue().ok_or(LifecycleError::HandleSpaceExhausted)?;
        request.handle = handle;

        if !pre_verified {
            if let Err(reason) = verifier.verify(&request) {
                warn!(handle, %reason, "request rejected by verifier");
                return Err(LifecycleError::RejectedByVerifier(reason));
            }
        }

        if self.active.contains_key(&handle) {
            return Err(LifecycleError::DuplicateHandle(handle));
        }

        let scheduled_duration = request.duration;
        self.active.insert(handle, RequestRecord { request: request.clone(), scheduled_duration });
        self.queue.enqueue(request);
        Ok(handle)
    }

    /// Timer-fire path: synthesize the untune for `handle` and enqueue it.
    /// Bookkeeping for `handle` itself is dropped only once the untune has
    /// actually been processed — see [`RequestLifecycle::retire`].
    pub fn expire(&self, handle: Handle) -> Option<Handle> {
        let record = self.active.get(&handle)?;
        let untune_handle = self.handles.issue()?;
        let untune = record.request.synthesize_untune(untune_handle);
        drop(record);
        self.queue.enqueue(untune);
        Some(untune_handle)
    }

    /// Rejects negative durations other than `-1`, and rejects shortening
    /// below the duration that was scheduled when the request (or its last
    /// accepted update) was admitted.
    pub fn update_duration(&self, handle: Handle, new_duration: DurationMs) -> Result<()> {
        if new_duration < INDEFINITE {
            return Err(LifecycleError::InvalidDuration(new_duration));
        }
        let mut record = self.active.get_mut(&handle).ok_or(LifecycleError::UnknownHandle(handle))?;
        if new_duration != INDEFINITE && new_duration < record.scheduled_duration {
            return Err(LifecycleError::DurationWouldShorten(handle));
        }
        record.request.duration = new_duration;
        record.scheduled_duration = new_duration;
        Ok(())
    }

    /// GC path: synthesize untunes for every handle still owned by `pid`.
    pub fn client_died(&self, pid: i32) -> Vec<Handle> {
        let owned: Vec<Handle> =
            self.active.iter().filter(|e| e.value().request.client_pid == pid).map(|e| *e.key()).collect();

        let mut untune_handles = Vec::with_capacity(owned.len());
        for handle in owned {
            if let Some(untune_handle) = self.expire(handle) {
                untune_handles.push(untune_handle);
            }
        }
        if !untune_handles.is_empty() {
            info!(pid, count = untune_handles.len(), "synthesized untunes for dead client");
        }
        untune_handles
    }

    /// Drop bookkeeping for a handle once its untune has fully drained from
    /// the CCT. Untuning an unknown handle is a no-op, matching the source's
    /// idempotence guarantee.
    pub fn retire(&self, handle: Handle) {
        self.active.remove(&handle);
    }

    pub fn is_tracked(&self, handle: Handle) -> bool {
        self.active.contains_key(&handle)
    }

    pub fn request_snapshot(&self, handle: Handle) -> Option<Request> {
        self.active.get(&handle).map(|r| r.request.clone())
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Distinct client pids currently owning at least one tracked handle,
    /// for the garbage collector to sweep.
    pub fn tracked_pids(&self) -> Vec<i32> {
        let mut pids: Vec<i32> = self.active.iter().map(|e| e.value().request.client_pid).collect();
        pids.sort_unstable();
        pids.dedup();
        pids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restuned_types::{Priority, RequestType};

    fn sample(pid: i32, duration: DurationMs) -> Request {
        Request::new(0, RequestType::ResourceTune, Priority::SystemHigh, duration, pid, pid, vec![])
    }

    #[test]
    fn submit_tracks_and_enqueues() {
        let queue = Arc::new(RequestQueue::new(8));
        let lc = RequestLifecycle::new(queue.clone());
        let handle = lc.submit(sample(100, 5000), true, &AlwaysVerified).unwrap();
        assert!(lc.is_tracked(handle));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn update_duration_rejects_shortening() {
        let queue = Arc::new(RequestQueue::new(8));
        let lc = RequestLifecycle::new(queue);
        let handle = lc.submit(sample(100, 5000), true, &AlwaysVerified).unwrap();
        assert!(lc.update_duration(handle, 1000).is_err());
        assert!(lc.update_duration(handle, 6000).is_ok());
        assert!(lc.update_duration(handle, INDEFINITE).is_ok());
    }

    #[test]
    fn update_duration_rejects_bad_negative() {
        let queue = Arc::new(RequestQueue::new(8));
        let lc = RequestLifecycle::new(queue);
        let handle = lc.submit(sample(100, 5000), true, &AlwaysVerified).unwrap();
        assert!(lc.update_duration(handle, -7).is_err());
    }

    #[test]
    fn client_died_synthesizes_untunes_for_owned_handles() {
        let queue = Arc::new(RequestQueue::new(8));
        let lc = RequestLifecycle::new(queue.clone());
        lc.submit(sample(200, INDEFINITE), true, &AlwaysVerified).unwrap();
        lc.submit(sample(200, INDEFINITE), true, &AlwaysVerified).unwrap();
        lc.submit(sample(300, INDEFINITE), true, &AlwaysVerified).unwrap();

        let untuned = lc.client_died(200);
        assert_eq!(untuned.len(), 2);
        // 3 original submits + 2 synthesized untunes
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn retire_makes_handle_untracked() {
        let queue = Arc::new(RequestQueue::new(8));
        let lc = RequestLifecycle::new(queue);
        let handle = lc.submit(sample(100, INDEFINITE), true, &AlwaysVerified).unwrap();
        lc.retire(handle);
        assert!(!lc.is_tracked(handle));
    }
}
