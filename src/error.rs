use thiserror::Error;

/// Top-level daemon error, composed from every subsystem's own error type
/// at the boundary that owns the process lifetime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] restuned_config::ConfigError),
    #[error(transparent)]
    Registry(#[from] restuned_registry::RegistryError),
    #[error(transparent)]
    Cct(#[from] restuned_cct::CctError),
    #[error(transparent)]
    Lifecycle(#[from] restuned_lifecycle::LifecycleError),
    #[error(transparent)]
    Classifier(#[from] restuned_classifier::ClassifierError),
    #[error(transparent)]
    Kernel(#[from] restuned_kernel::KernelError),
    #[error(transparent)]
    Ipc(#[from] restuned_ipc::IpcError),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
