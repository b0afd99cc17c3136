use serde::{Deserialize, Serialize};
use std::fmt;

use crate::device_mode::DeviceMode;

/// Packed 32-bit resource identity: `(resType: 8 bits) << 16 | (resId: 16 bits)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceCode(pub u32);

impl ResourceCode {
    pub fn new(res_type: u8, res_id: u16) -> Self {
        ResourceCode(((res_type as u32) << 16) | (res_id as u32))
    }

    pub fn res_type(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub fn res_id(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl From<u32> for ResourceCode {
    fn from(v: u32) -> Self {
        ResourceCode(v)
    }
}

impl From<ResourceCode> for u32 {
    fn from(c: ResourceCode) -> Self {
        c.0
    }
}

impl fmt::Display for ResourceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}(type={},id={})", self.0, self.res_type(), self.res_id())
    }
}

/// Dimensionality along which a resource is independently arbitrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplyScope {
    Global,
    Core,
    Cluster,
    Cgroup,
}

/// Per-resource conflict resolution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Policy {
    Instant,
    HigherBetter,
    LowerBetter,
    Lazy,
    PassThrough,
    PassThroughAppend,
}

impl Policy {
    /// `policy ∈ {passThrough, passThroughAppend} ⇔ no arbitration list is kept;
    /// a reference counter is kept instead.`
    pub fn is_pass_through(self) -> bool {
        matches!(self, Policy::PassThrough | Policy::PassThroughAppend)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    System,
    ThirdParty,
}

/// Logical placement info carried by a resource node for scoped knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResInfo {
    pub logical_cluster: Option<i32>,
    pub logical_core: Option<i32>,
}

/// A single resource write requested by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub code: ResourceCode,
    /// Ordered sequence of values, length 1..N. Arbitration uses `values[1]`
    /// when present, else `values[0]`.
    pub values: Vec<i32>,
    pub info: ResInfo,
}

impl Resource {
    pub fn new(code: ResourceCode, values: Vec<i32>) -> Self {
        Resource { code, values, info: ResInfo::default() }
    }

    /// The value arbitration compares on: `values[1]` if present else `values[0]`.
    pub fn arbitration_value(&self) -> Option<i32> {
        if self.values.len() > 1 {
            self.values.get(1).copied()
        } else {
            self.values.first().copied()
        }
    }
}

/// Static configuration describing how a resource is discovered, arbitrated
/// and applied. Registered once in the `ResourceRegistry` and immutable
/// thereafter.
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    pub code: ResourceCode,
    /// Path template, may contain `%cluster%`, `%core%`, `%cgroup%` markers.
    pub path: String,
    pub apply_scope: ApplyScope,
    pub policy: Policy,
    pub permission: Permission,
    pub modes: DeviceMode,
    pub high_threshold: Option<i32>,
    pub low_threshold: Option<i32>,
    pub unit: Option<String>,
    pub default_value: i32,
}

impl ResourceConfig {
    pub fn within_bounds(&self, value: i32) -> bool {
        if let Some(hi) = self.high_threshold {
            if value > hi {
                return false;
            }
        }
        if let Some(lo) = self.low_threshold {
            if value < lo {
                return false;
            }
        }
        true
    }
}
