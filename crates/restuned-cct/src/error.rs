use restuned_types::ResourceCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CctError {
    #[error("resource {0} has no registered configuration")]
    UnknownResource(ResourceCode),
    #[error("logical coordinate for resource {0} does not resolve to a physical slot")]
    UnresolvedCoordinate(ResourceCode),
    #[error("computed index for resource {0} is out of range")]
    IndexOutOfRange(ResourceCode),
    #[error("priority {0:?} does not own an arbitration bucket")]
    NotAnArbitrationPriority(restuned_types::Priority),
    #[error("handle does not match any tracked arbitration slot")]
    StaleHandle,
}

pub type Result<T> = std::result::Result<T, CctError>;
