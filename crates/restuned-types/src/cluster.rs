use serde::{Deserialize, Serialize};

/// Physical cluster as discovered by topology discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub physical_id: i32,
    pub start_cpu: i32,
    pub num_cpus: i32,
    /// Unitless capacity figure used only for ordering logical ids.
    pub capacity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CGroupConfig {
    pub name: String,
    pub id: i32,
    pub creation_needed: bool,
    pub threaded: bool,
}
