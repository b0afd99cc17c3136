use serde::{Deserialize, Serialize};

use crate::priority::Priority;
use crate::resource::Resource;

/// Monotone 64-bit identifier for an accepted request.
pub type Handle = u64;

/// Duration in milliseconds. `-1` means indefinite.
pub type DurationMs = i64;

pub const INDEFINITE: DurationMs = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    ResourceTune,
    ResourceUntune,
    SignalTune,
    SignalUntune,
    PropGet,
}

/// A client-submitted (or internally synthesized) tune/untune request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub handle: Handle,
    pub request_type: RequestType,
    pub priority: Priority,
    pub duration: DurationMs,
    pub client_pid: i32,
    pub client_tid: i32,
    pub resources: Vec<Resource>,
    /// For a synthesized untune, the handle of the tune it is tearing down
    /// — the CCT consumer needs this to find the `CctHandle`s it recorded
    /// at insertion time, since `handle` on the untune itself addresses a
    /// freshly issued slot in the handle space, not the original tune's.
    /// `None` on every client-submitted request.
    pub origin_handle: Option<Handle>,
}

impl Request {
    pub fn new(
        handle: Handle,
        request_type: RequestType,
        priority: Priority,
        duration: DurationMs,
        client_pid: i32,
        client_tid: i32,
        resources: Vec<Resource>,
    ) -> Self {
        Request { handle, request_type, priority, duration, client_pid, client_tid, resources, origin_handle: None }
    }

    pub fn is_tune(&self) -> bool {
        matches!(self.request_type, RequestType::ResourceTune | RequestType::SignalTune)
    }

    /// Build the paired untune for this tune, carrying `HIGH_TRANSFER`
    /// priority so `RequestQueue` services it ahead of ordinary tunes.
    /// CCT removal does not recompute the arbitration bucket from this
    /// priority — it uses the `CctHandle` recorded at insertion time — see
    /// DESIGN.md "Open question: HIGH_TRANSFER and bucket addressing".
    pub fn synthesize_untune(&self, handle: Handle) -> Request {
        Request {
            handle,
            request_type: RequestType::ResourceUntune,
            priority: Priority::HighTransfer,
            duration: INDEFINITE,
            client_pid: self.client_pid,
            client_tid: self.client_tid,
            resources: self.resources.clone(),
            origin_handle: Some(self.handle),
        }
    }
}
