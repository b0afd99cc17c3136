//! `KernelApplier`: the daemon's sole side-effect sink onto the live
//! system (sysfs writes, cgroup moves, service restarts).

mod error;
mod kernel_applier;
mod resource_applier;
mod test_double;

pub use error::{KernelError, Result};
pub use kernel_applier::{KernelApplier, LinuxKernelApplier};
pub use resource_applier::KernelResourceApplier;
pub use test_double::InMemoryKernelApplier;
