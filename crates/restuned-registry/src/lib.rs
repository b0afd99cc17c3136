//! Resource, target topology and signal catalogs.
//!
//! These registries are populated once during daemon startup (from config
//! plus live sysfs topology discovery) and then read concurrently by every
//! request-handling task, hence the `DashMap`-backed, cheaply-`Clone`able
//! shape of each registry handle.

pub mod error;
pub mod persistence;
pub mod resource_registry;
pub mod signal_registry;
pub mod target_registry;

pub use error::{RegistryError, Result};
pub use persistence::{RestoreEntry, RestoreFile};
pub use resource_registry::ResourceRegistry;
pub use signal_registry::SignalRegistry;
pub use target_registry::TargetRegistry;
