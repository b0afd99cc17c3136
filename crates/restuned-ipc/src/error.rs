use restuned_types::ErrorKind;
use thiserror::Error;

/// Errors this crate can itself raise, beyond whatever `restuned_types::Error`
/// a downstream admission/lifecycle failure already carries.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("malformed request encoding: {0}")]
    Decode(String),
    #[error(transparent)]
    Core(#[from] restuned_types::Error),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("unknown handle {0}")]
    UnknownHandle(restuned_types::Handle),
}

impl From<restuned_lifecycle::LifecycleError> for IpcError {
    fn from(e: restuned_lifecycle::LifecycleError) -> Self {
        use restuned_lifecycle::LifecycleError as L;
        match e {
            L::UnknownHandle(h) => IpcError::UnknownHandle(h),
            L::RejectedByVerifier(reason) => IpcError::Rejected(reason),
            other => IpcError::Core(restuned_types::Error::InvalidValue(other.to_string())),
        }
    }
}

impl IpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IpcError::Decode(_) => ErrorKind::BadArg,
            IpcError::Core(e) => e.kind(),
            IpcError::Rejected(_) => ErrorKind::Permission,
            IpcError::UnknownHandle(_) => ErrorKind::InvalidValue,
        }
    }
}

pub type Result<T> = std::result::Result<T, IpcError>;
