use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error vocabulary returned to callers across the client/ingress boundary.
/// Kept separate from the richer per-crate `thiserror` enums so every crate
/// can map its own errors down to this stable, wire-friendly set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Ok,
    BadArg,
    MemAlloc,
    InvalidValue,
    Permission,
    SocketOp,
    FileNotFound,
    CgroupCreate,
    YamlParse,
    ResourceNotSupported,
    ModuleInit,
    PropParse,
    RateLimited,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("bad argument: {0}")]
    BadArg(String),
    #[error("allocation failed: {0}")]
    MemAlloc(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("socket operation failed: {0}")]
    SocketOp(String),
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("cgroup creation failed: {0}")]
    CgroupCreate(String),
    #[error("yaml parse error: {0}")]
    YamlParse(String),
    #[error("resource not supported: {0}")]
    ResourceNotSupported(String),
    #[error("module init failed: {0}")]
    ModuleInit(String),
    #[error("property parse error: {0}")]
    PropParse(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadArg(_) => ErrorKind::BadArg,
            Error::MemAlloc(_) => ErrorKind::MemAlloc,
            Error::InvalidValue(_) => ErrorKind::InvalidValue,
            Error::Permission(_) => ErrorKind::Permission,
            Error::SocketOp(_) => ErrorKind::SocketOp,
            Error::FileNotFound(_) => ErrorKind::FileNotFound,
            Error::CgroupCreate(_) => ErrorKind::CgroupCreate,
            Error::YamlParse(_) => ErrorKind::YamlParse,
            Error::ResourceNotSupported(_) => ErrorKind::ResourceNotSupported,
            Error::ModuleInit(_) => ErrorKind::ModuleInit,
            Error::PropParse(_) => ErrorKind::PropParse,
            Error::RateLimited(_) => ErrorKind::RateLimited,
        }
    }
}
