use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// Identifies a named bundle of resources, packed the same way as a
/// resource code: a signal id plus a signal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalId {
    pub id: u32,
    pub sig_type: u32,
}

/// A named bundle of resources with a default timeout, materialized into a
/// multi-resource tune request when expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub signal_id: SignalId,
    pub timeout_ms: i64,
    pub resources: Vec<Resource>,
    /// Child signal ids applied together with this one.
    pub derivatives: Vec<SignalId>,
}
