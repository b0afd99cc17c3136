use restuned_types::Handle;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("handle generator exhausted")]
    HandleSpaceExhausted,
    #[error("handle {0} already tracked, rejecting duplicate submission")]
    DuplicateHandle(Handle),
    #[error("handle {0} is not tracked")]
    UnknownHandle(Handle),
    #[error("duration update rejected: would shorten request {0} below its scheduled duration")]
    DurationWouldShorten(Handle),
    #[error("duration {0} is invalid (must be -1 or a positive millisecond count)")]
    InvalidDuration(i64),
    #[error("request queue is shutting down")]
    QueueClosed,
    #[error("request rejected by verifier: {0}")]
    RejectedByVerifier(String),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
