use std::collections::HashMap;

use parking_lot::RwLock;

/// Extension point for per-app post-processing: a registered hook can
/// rewrite the signal id/type the pipeline is about to expand and submit,
/// keyed by the exec'd process's `comm`.
pub trait PostProcessHook: Send + Sync {
    fn post_process(&self, pid: i32, sig_id: u32, sig_type: u32) -> (u32, u32);
}

#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Box<dyn PostProcessHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        HookRegistry::default()
    }

    pub fn register(&self, comm: impl Into<String>, hook: Box<dyn PostProcessHook>) {
        self.hooks.write().insert(comm.into(), hook);
    }

    /// Run the hook registered for `comm`, if any, returning the
    /// (possibly rewritten) `(sig_id, sig_type)` pair.
    pub fn apply(&self, comm: &str, pid: i32, sig_id: u32, sig_type: u32) -> (u32, u32) {
        match self.hooks.read().get(comm) {
            Some(hook) => hook.post_process(pid, sig_id, sig_type),
            None => (sig_id, sig_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DoubleSigType;
    impl PostProcessHook for DoubleSigType {
        fn post_process(&self, _pid: i32, sig_id: u32, sig_type: u32) -> (u32, u32) {
            (sig_id, sig_type * 2)
        }
    }

    #[test]
    fn unregistered_comm_passes_through_unchanged() {
        let registry = HookRegistry::new();
        assert_eq!(registry.apply("firefox", 1, 10, 1), (10, 1));
    }

    #[test]
    fn registered_hook_rewrites_sig_type() {
        let registry = HookRegistry::new();
        registry.register("firefox", Box::new(DoubleSigType));
        assert_eq!(registry.apply("firefox", 1, 10, 3), (10, 6));
    }
}
