use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("i/o error on {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("path {0} already exists")]
    AlreadyExists(String),
    #[error("cgroup operation failed: {0}")]
    Cgroup(String),
    #[error("service control failed for {0}")]
    ServiceControl(String),
}

pub type Result<T> = std::result::Result<T, KernelError>;
