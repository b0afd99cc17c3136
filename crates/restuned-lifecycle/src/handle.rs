use std::sync::atomic::{AtomicU64, Ordering};

use restuned_types::Handle;

/// Strictly monotonic handle issuance under a single atomic counter.
///
/// The source returns `-1` out-of-band on wraparound; here exhaustion is
/// `None` instead of overloading a sentinel into the handle's own value
/// space — see DESIGN.md's "handle-generator wraparound" decision.
#[derive(Default)]
pub struct HandleGenerator {
    next: AtomicU64,
}

impl HandleGenerator {
    pub fn new() -> Self {
        HandleGenerator { next: AtomicU64::new(0) }
    }

    pub fn issue(&self) -> Option<Handle> {
        let value = self.next.fetch_add(1, Ordering::SeqCst);
        if value == u64::MAX {
            None
        } else {
            Some(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_strictly_increasing_handles() {
        let gen = HandleGenerator::new();
        let a = gen.issue().unwrap();
        let b = gen.issue().unwrap();
        assert!(b > a);
    }

    #[test]
    fn exhaustion_returns_none() {
        let gen = HandleGenerator { next: AtomicU64::new(u64::MAX) };
        assert_eq!(gen.issue(), None);
    }
}
