use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("resource {0} is not registered")]
    UnknownResource(String),
    #[error("cgroup {0} is not registered")]
    UnknownCgroup(i32),
    #[error("signal {0:?} is not registered")]
    UnknownSignal(restuned_types::SignalId),
    #[error("logical cluster {0} has no physical mapping")]
    UnknownLogicalCluster(i32),
    #[error("logical core {logical_core_id} is out of range for cluster {logical_cluster_id} ({num_cpus} cpus)")]
    InvalidLogicalCoreId { logical_cluster_id: i32, logical_core_id: i32, num_cpus: i32 },
    #[error("topology discovery failed: {0}")]
    TopologyDiscovery(String),
    #[error("persistence i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed restore file line: {0}")]
    MalformedRestoreLine(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
