use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("process {0} has no /proc entry")]
    MissingProc(i32),
    #[error("comm could not be read for pid {0}")]
    MissingComm(i32),
    #[error(transparent)]
    Registry(#[from] restuned_registry::RegistryError),
    #[error(transparent)]
    Lifecycle(#[from] restuned_lifecycle::LifecycleError),
    #[error(transparent)]
    Kernel(#[from] restuned_kernel::KernelError),
    #[error("netlink error: {0}")]
    Netlink(String),
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
