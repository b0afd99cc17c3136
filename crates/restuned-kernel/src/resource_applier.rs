use std::sync::Arc;

use tracing::warn;

use restuned_cct::ResourceApplier;
use restuned_types::{ApplyScope, Resource, ResourceConfig};

use crate::kernel_applier::KernelApplier;

/// Adapts a [`KernelApplier`] into the CCT's [`ResourceApplier`] seam by
/// substituting `%core%`/`%cluster%`/`%cgroup%` markers in a resource's
/// path template before writing or tearing it down.
pub struct KernelResourceApplier {
    kernel: Arc<dyn KernelApplier>,
}

impl KernelResourceApplier {
    pub fn new(kernel: Arc<dyn KernelApplier>) -> Self {
        KernelResourceApplier { kernel }
    }

    /// Public seam for the daemon's startup default-value snapshot, which
    /// needs the same path materialization without going through `apply`/
    /// `tear` and their CCT-driven side effects.
    pub fn path_for(config: &ResourceConfig, resource: &Resource) -> String {
        Self::materialize_path(config, resource)
    }

    fn materialize_path(config: &ResourceConfig, resource: &Resource) -> String {
        match config.apply_scope {
            ApplyScope::Global => config.path.clone(),
            ApplyScope::Core => {
                let core = resource.info.logical_core.unwrap_or(0);
                config.path.replace("%core%", &core.to_string())
            }
            ApplyScope::Cluster => {
                let cluster = resource.info.logical_cluster.unwrap_or(0);
                config.path.replace("%cluster%", &cluster.to_string())
            }
            ApplyScope::Cgroup => {
                let cgroup = resource.values.first().copied().unwrap_or(0);
                config.path.replace("%cgroup%", &cgroup.to_string())
            }
        }
    }
}

impl ResourceApplier for KernelResourceApplier {
    fn apply(&mut self, config: &ResourceConfig, resource: &Resource) {
        let path = Self::materialize_path(config, resource);
        let value = resource.arbitration_value().unwrap_or(config.default_value);
        if let Err(e) = self.kernel.write_knob(&path, &value.to_string()) {
            warn!(path, error = %e, "resource apply failed");
        }
    }

    fn tear(&mut self, config: &ResourceConfig, resource: &Resource) {
        let path = Self::materialize_path(config, resource);
        if let Err(e) = self.kernel.write_knob(&path, &config.default_value.to_string()) {
            warn!(path, error = %e, "resource tear failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_double::InMemoryKernelApplier;
    use restuned_types::{DeviceMode, Permission, Policy, ResourceCode};

    fn core_config(code: ResourceCode) -> ResourceConfig {
        ResourceConfig {
            code,
            path: "/sys/fake/cpu%core%/freq".into(),
            apply_scope: ApplyScope::Core,
            policy: Policy::Instant,
            permission: Permission::System,
            modes: DeviceMode::RESUME,
            high_threshold: None,
            low_threshold: None,
            unit: None,
            default_value: 800,
        }
    }

    #[test]
    fn apply_substitutes_core_marker() {
        let kernel = Arc::new(InMemoryKernelApplier::default());
        let mut applier = KernelResourceApplier::new(kernel.clone());
        let code = ResourceCode::new(1, 1);
        let config = core_config(code);
        let mut resource = Resource::new(code, vec![1200]);
        resource.info.logical_core = Some(3);

        applier.apply(&config, &resource);
        assert_eq!(kernel.read_knob("/sys/fake/cpu3/freq").unwrap(), "1200");
    }

    #[test]
    fn tear_restores_default_for_scoped_resource() {
        let kernel = Arc::new(InMemoryKernelApplier::default());
        let mut applier = KernelResourceApplier::new(kernel.clone());
        let code = ResourceCode::new(1, 2);
        let config = core_config(code);
        let mut resource = Resource::new(code, vec![1200]);
        resource.info.logical_core = Some(1);

        applier.tear(&config, &resource);
        assert_eq!(kernel.read_knob("/sys/fake/cpu1/freq").unwrap(), "800");
    }
}
