use dashmap::DashMap;
use std::sync::Arc;

use restuned_types::{Signal, SignalId};

use crate::error::{RegistryError, Result};

/// Catalog of named resource bundles ("signals") that expand into a
/// multi-resource tune request when a client issues a signal tune/untune.
#[derive(Clone, Default)]
pub struct SignalRegistry {
    signals: Arc<DashMap<SignalId, Signal>>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        SignalRegistry::default()
    }

    pub fn register(&self, signal: Signal) {
        self.signals.insert(signal.signal_id, signal);
    }

    pub fn get(&self, id: SignalId) -> Result<Signal> {
        self.signals.get(&id).map(|e| e.value().clone()).ok_or(RegistryError::UnknownSignal(id))
    }

    /// Resolve a signal and every transitive derivative it names, in
    /// breadth-first order, without visiting an id twice.
    pub fn resolve_with_derivatives(&self, id: SignalId) -> Result<Vec<Signal>> {
        let mut resolved = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(id);

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            let signal = self.get(next)?;
            for derivative in &signal.derivatives {
                queue.push_back(*derivative);
            }
            resolved.push(signal);
        }
        Ok(resolved)
    }
}
