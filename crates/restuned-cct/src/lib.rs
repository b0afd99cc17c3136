//! Conflict-Coordination Table: per-resource arbitration across concurrent
//! tune requests.
//!
//! Every mutating method here expects to run on a single task — per the
//! daemon's single-writer discipline, the CCT itself carries no internal
//! locking.

mod applier;
mod bucket;
mod coordinate;
mod error;
mod table;

pub use applier::{NullApplier, ResourceApplier};
pub use error::{CctError, Result};
pub use table::{Cct, CctHandle};
