use dashmap::DashMap;
use std::sync::Arc;

use restuned_types::{ResourceCode, ResourceConfig};

use crate::error::{RegistryError, Result};

/// Catalog of every statically configured resource the daemon knows how to
/// arbitrate and apply. Registration overwrites any previous entry for the
/// same code, matching the source's "last config file wins" load order.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    configs: Arc<DashMap<ResourceCode, ResourceConfig>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        ResourceRegistry { configs: Arc::new(DashMap::new()) }
    }

    pub fn register(&self, config: ResourceConfig) {
        self.configs.insert(config.code, config);
    }

    pub fn get(&self, code: ResourceCode) -> Result<ResourceConfig> {
        self.configs
            .get(&code)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::UnknownResource(code.to_string()))
    }

    pub fn contains(&self, code: ResourceCode) -> bool {
        self.configs.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn all_codes(&self) -> Vec<ResourceCode> {
        self.configs.iter().map(|entry| *entry.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restuned_types::{ApplyScope, DeviceMode, Permission, Policy};

    fn sample(code: ResourceCode) -> ResourceConfig {
        ResourceConfig {
            code,
            path: "/sys/fake/%core%".into(),
            apply_scope: ApplyScope::Core,
            policy: Policy::HigherBetter,
            permission: Permission::System,
            modes: DeviceMode::RESUME,
            high_threshold: Some(3000),
            low_threshold: Some(0),
            unit: Some("MHz".into()),
            default_value: 800,
        }
    }

    #[test]
    fn register_then_lookup() {
        let reg = ResourceRegistry::new();
        let code = ResourceCode::new(1, 1);
        reg.register(sample(code));
        assert!(reg.contains(code));
        assert_eq!(reg.get(code).unwrap().default_value, 800);
    }

    #[test]
    fn reregistering_overwrites() {
        let reg = ResourceRegistry::new();
        let code = ResourceCode::new(1, 2);
        reg.register(sample(code));
        let mut updated = sample(code);
        updated.default_value = 1200;
        reg.register(updated);
        assert_eq!(reg.get(code).unwrap().default_value, 1200);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_resource_errors() {
        let reg = ResourceRegistry::new();
        assert!(reg.get(ResourceCode::new(9, 9)).is_err());
    }
}
