use restuned_types::{Resource, ResourceConfig};

/// Pluggable per-resource apply/tear capability. The CCT calls into this at
/// every head change; concrete implementations live in `restuned-kernel`
/// and just write to sysfs, move a pid between cgroups, and so on.
///
/// Kept as a fixed two-method trait object rather than arbitrary callback
/// pointers: there is no dynamic dispatch surface beyond `apply`/`tear`.
pub trait ResourceApplier: Send {
    fn apply(&mut self, config: &ResourceConfig, resource: &Resource);
    fn tear(&mut self, config: &ResourceConfig, resource: &Resource);
}

/// No-op applier used by tests and by callers that only want to observe
/// arbitration decisions without touching the kernel.
#[derive(Default)]
pub struct NullApplier {
    pub applied: Vec<(restuned_types::ResourceCode, Vec<i32>)>,
    pub torn: Vec<restuned_types::ResourceCode>,
}

impl ResourceApplier for NullApplier {
    fn apply(&mut self, config: &ResourceConfig, resource: &Resource) {
        self.applied.push((config.code, resource.values.clone()));
    }

    fn tear(&mut self, config: &ResourceConfig, _resource: &Resource) {
        self.torn.push(config.code);
    }
}
