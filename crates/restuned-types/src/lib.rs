//! Shared data model for the restuned resource-tuning daemon.
//!
//! Every other crate in the workspace depends on this one for the request,
//! resource, and priority vocabulary so that the CCT, lifecycle engine, and
//! classifier all agree on what a "tune request" is without importing each
//! other.

pub mod cluster;
pub mod device_mode;
pub mod error;
pub mod priority;
pub mod proc_event;
pub mod request;
pub mod resource;
pub mod signal;

pub use cluster::{CGroupConfig, ClusterInfo};
pub use device_mode::DeviceMode;
pub use error::{Error, ErrorKind};
pub use priority::{Priority, PRIORITIES};
pub use proc_event::{ProcEvent, ProcEventKind};
pub use request::{DurationMs, Handle, Request, RequestType, INDEFINITE};
pub use resource::{ApplyScope, Permission, Policy, ResInfo, Resource, ResourceCode, ResourceConfig};
pub use signal::{Signal, SignalId};

pub type Result<T> = std::result::Result<T, Error>;
