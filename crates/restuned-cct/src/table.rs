use std::collections::HashMap;

use restuned_registry::{ResourceRegistry, TargetRegistry};
use restuned_types::{DeviceMode, Handle, Priority, Resource, ResourceCode, ResourceConfig, PRIORITIES};

use crate::applier::ResourceApplier;
use crate::bucket::Bucket;
use crate::coordinate::{group_count, resolve_coordinate, unknown_resource};
use crate::error::{CctError, Result};

/// Opaque token returned by [`Cct::insert_resource`], stored by the caller
/// (the request lifecycle engine) and handed back to [`Cct::remove_resource`]
/// for O(1) removal. Carries enough of its own addressing that removal never
/// needs to recompute logical→physical coordinates from a possibly-stale
/// request context.
#[derive(Debug, Clone, Copy)]
pub struct CctHandle {
    pub resource_code: ResourceCode,
    coordinate: usize,
    priority: Priority,
    slot: Option<usize>,
}

/// Per-(resource, scope-coordinate) arbitration state: one ordered bucket
/// per priority level plus the priority currently in effect. Tracking
/// `current_priority` at this granularity (rather than per-resource only)
/// is deliberate — see the project's grounding notes on `currentlyAppliedPriority`.
#[derive(Default)]
struct ScopeGroup {
    buckets: [Bucket; PRIORITIES],
    current_priority: Option<Priority>,
    pass_through_rank: u32,
    /// Representative resource for this coordinate, kept only so a
    /// pass-through group that drains to zero has something to tear with —
    /// pass-through entries never live in a bucket.
    last_pass_through: Option<Resource>,
}

struct ResourceTable {
    groups: Vec<ScopeGroup>,
}

impl ResourceTable {
    fn new(groups: usize) -> Self {
        ResourceTable { groups: (0..groups).map(|_| ScopeGroup::default()).collect() }
    }
}

/// The arbitration engine. Not `Sync` by design — per the single-writer
/// discipline, exactly one task ever holds `&mut Cct`.
pub struct Cct<A: ResourceApplier> {
    resources: HashMap<ResourceCode, ResourceTable>,
    registry: ResourceRegistry,
    target_registry: TargetRegistry,
    device_mode: DeviceMode,
    applier: A,
}

impl<A: ResourceApplier> Cct<A> {
    pub fn new(registry: ResourceRegistry, target_registry: TargetRegistry, applier: A) -> Self {
        let mut resources = HashMap::new();
        for code in registry.all_codes() {
            if let Ok(config) = registry.get(code) {
                let groups = group_count(config.apply_scope, &target_registry);
                resources.insert(code, ResourceTable::new(groups));
            }
        }
        Cct { resources, registry, target_registry, device_mode: DeviceMode::default(), applier }
    }

    pub fn set_device_mode(&mut self, mode: DeviceMode) {
        self.device_mode = mode;
    }

    pub fn current_priority(&self, code: ResourceCode, coordinate: usize) -> Option<Priority> {
        self.resources.get(&code)?.groups.get(coordinate)?.current_priority
    }

    /// Insert one resource write from an accepted tune request. Failures
    /// here drop this resource, not the whole request — the caller decides
    /// whether to continue with the request's remaining resources.
    pub fn insert_resource(&mut self, handle: Handle, priority: Priority, resource: Resource) -> Result<CctHandle> {
        let config = self.registry.get(resource.code).map_err(|_| unknown_resource(resource.code))?;
        let coordinate = resolve_coordinate(&config, &resource, &self.target_registry)?;

        let groups_needed = group_count(config.apply_scope, &self.target_registry);
        let table = self
            .resources
            .entry(resource.code)
            .or_insert_with(|| ResourceTable::new(groups_needed));
        if coordinate >= table.groups.len() {
            return Err(CctError::IndexOutOfRange(resource.code));
        }
        let group = &mut table.groups[coordinate];

        if config.policy.is_pass_through() {
            if matches!(config.policy, restuned_types::Policy::PassThrough) {
                group.pass_through_rank += 1;
            }
            group.last_pass_through = Some(resource.clone());
            if config.modes.contains(self.device_mode) {
                self.applier.apply(&config, &resource);
            }
            return Ok(CctHandle { resource_code: resource.code, coordinate, priority, slot: None });
        }

        let bucket_index = priority.bucket_index().ok_or(CctError::NotAnArbitrationPriority(priority))?;
        let bucket = &mut group.buckets[bucket_index];

        let slot = match config.policy {
            restuned_types::Policy::Instant => bucket.push_front(handle, resource.clone()),
            restuned_types::Policy::HigherBetter => {
                bucket.insert_sorted(handle, resource.clone(), |n, t| n.arbitration_value() > t.arbitration_value())
            }
            restuned_types::Policy::LowerBetter => {
                bucket.insert_sorted(handle, resource.clone(), |n, t| n.arbitration_value() < t.arbitration_value())
            }
            restuned_types::Policy::Lazy => bucket.push_back(handle, resource.clone()),
            restuned_types::Policy::PassThrough | restuned_types::Policy::PassThroughAppend => unreachable!(),
        };

        if bucket.head == Some(slot) {
            apply_action(&mut self.applier, self.device_mode, &config, group, priority, &resource);
        }

        Ok(CctHandle { resource_code: resource.code, coordinate, priority, slot: Some(slot) })
    }

    /// Detach a previously inserted resource, promote the next winner if
    /// one exists, or tear down to the default value if its group is now
    /// fully drained.
    pub fn remove_resource(&mut self, handle: CctHandle) -> Result<()> {
        let config = self.registry.get(handle.resource_code).map_err(|_| unknown_resource(handle.resource_code))?;
        let table = self.resources.get_mut(&handle.resource_code).ok_or(CctError::StaleHandle)?;
        if handle.coordinate >= table.groups.len() {
            return Err(CctError::IndexOutOfRange(handle.resource_code));
        }
        let group = &mut table.groups[handle.coordinate];

        if config.policy.is_pass_through() {
            match config.policy {
                restuned_types::Policy::PassThrough => {
                    group.pass_through_rank = group.pass_through_rank.saturating_sub(1);
                    if group.pass_through_rank == 0 {
                        if let Some(resource) = group.last_pass_through.take() {
                            self.applier.tear(&config, &resource);
                        }
                    }
                }
                // Open question resolved: passThroughAppend keeps no counter
                // and never tears on removal (see DESIGN.md).
                restuned_types::Policy::PassThroughAppend => {}
                _ => unreachable!(),
            }
            return Ok(());
        }

        let slot = handle.slot.ok_or(CctError::StaleHandle)?;
        let bucket_index = handle.priority.bucket_index().ok_or(CctError::NotAnArbitrationPriority(handle.priority))?;
        let bucket = &mut group.buckets[bucket_index];
        let Some((removed_resource, was_head)) = bucket.remove(slot) else {
            return Err(CctError::StaleHandle);
        };

        if !bucket.is_empty() {
            if was_head {
                let resource = bucket.head_entry().expect("just checked non-empty").resource.clone();
                apply_action(&mut self.applier, self.device_mode, &config, group, handle.priority, &resource);
            }
            return Ok(());
        }

        let mut applied = false;
        for idx in 0..PRIORITIES {
            if group.buckets[idx].is_empty() {
                continue;
            }
            let priority = Priority::from_bucket_index(idx).expect("valid bucket index");
            let resource = group.buckets[idx].head_entry().expect("non-empty").resource.clone();
            group.current_priority = Some(priority);
            if config.modes.contains(self.device_mode) {
                self.applier.apply(&config, &resource);
            }
            applied = true;
            break;
        }

        if !applied {
            self.applier.tear(&config, &removed_resource);
            group.current_priority = None;
        }

        Ok(())
    }
}

/// Apply a would-be winning resource if its priority is at least as strong
/// as whatever the group currently has applied, subject to the device-mode
/// mask. Split out of `Cct`'s methods so the borrow checker can see
/// `applier`/`device_mode` as disjoint from the `group` borrow held by callers.
fn apply_action<A: ResourceApplier>(
    applier: &mut A,
    device_mode: DeviceMode,
    config: &ResourceConfig,
    group: &mut ScopeGroup,
    priority: Priority,
    resource: &Resource,
) {
    let gate_passes = match group.current_priority {
        None => true,
        Some(current) => current >= priority,
    };
    if !gate_passes {
        return;
    }

    if config.modes.contains(device_mode) {
        applier.apply(config, resource);
        group.current_priority = Some(priority);
    } else {
        tracing::warn!(resource = %config.code, ?device_mode, "resource mode rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applier::NullApplier;
    use restuned_registry::TargetRegistry;
    use restuned_types::{ApplyScope, Permission, Policy, Resource, ResourceCode};

    fn registry_with(code: ResourceCode, policy: Policy, apply_scope: ApplyScope) -> ResourceRegistry {
        let reg = ResourceRegistry::new();
        reg.register(ResourceConfig {
            code,
            path: "/sys/fake/%cluster%".into(),
            apply_scope,
            policy,
            permission: Permission::System,
            modes: DeviceMode::RESUME,
            high_threshold: Some(3000),
            low_threshold: Some(0),
            unit: Some("MHz".into()),
            default_value: 800,
        });
        reg
    }

    fn global_resource(code: ResourceCode, value: i32) -> Resource {
        Resource::new(code, vec![value])
    }

    #[test]
    fn higher_better_scenario_from_two_clients() {
        let code = ResourceCode::new(1, 1);
        let reg = registry_with(code, Policy::HigherBetter, ApplyScope::Global);
        let target = TargetRegistry::new();
        let mut cct = Cct::new(reg, target, NullApplier::default());

        let h_a = cct.insert_resource(1, Priority::SystemLow, global_resource(code, 1200)).unwrap();
        let h_b = cct.insert_resource(2, Priority::SystemLow, global_resource(code, 1800)).unwrap();

        assert_eq!(cct.applier.applied.last().unwrap().1, vec![1800]);
        assert_eq!(cct.current_priority(code, 0), Some(Priority::SystemLow));

        cct.remove_resource(h_b).unwrap();
        assert_eq!(cct.applier.applied.last().unwrap().1, vec![1200]);

        cct.remove_resource(h_a).unwrap();
        assert_eq!(cct.applier.torn.last(), Some(&code));
        assert_eq!(cct.current_priority(code, 0), None);
    }

    #[test]
    fn stronger_priority_overrides_weaker_and_restores_on_exit() {
        let code = ResourceCode::new(1, 2);
        let reg = registry_with(code, Policy::Instant, ApplyScope::Global);
        let target = TargetRegistry::new();
        let mut cct = Cct::new(reg, target, NullApplier::default());

        let h_low = cct.insert_resource(1, Priority::ThirdPartyLow, global_resource(code, 2000)).unwrap();
        assert_eq!(cct.applier.applied.last().unwrap().1, vec![2000]);

        let h_high = cct.insert_resource(2, Priority::SystemHigh, global_resource(code, 2400)).unwrap();
        assert_eq!(cct.applier.applied.last().unwrap().1, vec![2400]);

        cct.remove_resource(h_high).unwrap();
        assert_eq!(cct.applier.applied.last().unwrap().1, vec![2000]);

        cct.remove_resource(h_low).unwrap();
        assert_eq!(cct.applier.torn.last(), Some(&code));
    }

    #[test]
    fn pass_through_counts_and_tears_on_zero() {
        let code = ResourceCode::new(2, 1);
        let reg = registry_with(code, Policy::PassThrough, ApplyScope::Global);
        let target = TargetRegistry::new();
        let mut cct = Cct::new(reg, target, NullApplier::default());

        let h1 = cct.insert_resource(1, Priority::SystemHigh, global_resource(code, 1)).unwrap();
        let h2 = cct.insert_resource(2, Priority::SystemHigh, global_resource(code, 1)).unwrap();
        let h3 = cct.insert_resource(3, Priority::SystemHigh, global_resource(code, 1)).unwrap();
        assert_eq!(cct.applier.applied.len(), 3);

        cct.remove_resource(h1).unwrap();
        cct.remove_resource(h2).unwrap();
        assert!(cct.applier.torn.is_empty());
        cct.remove_resource(h3).unwrap();
        assert_eq!(cct.applier.torn.last(), Some(&code));
    }

    #[test]
    fn pass_through_append_never_tears_on_removal() {
        let code = ResourceCode::new(2, 2);
        let reg = registry_with(code, Policy::PassThroughAppend, ApplyScope::Global);
        let target = TargetRegistry::new();
        let mut cct = Cct::new(reg, target, NullApplier::default());

        let h1 = cct.insert_resource(1, Priority::SystemHigh, global_resource(code, 1)).unwrap();
        cct.remove_resource(h1).unwrap();
        assert!(cct.applier.torn.is_empty());
    }

    #[test]
    fn lazy_policy_is_fifo_among_equal_priority() {
        let code = ResourceCode::new(3, 1);
        let reg = registry_with(code, Policy::Lazy, ApplyScope::Global);
        let target = TargetRegistry::new();
        let mut cct = Cct::new(reg, target, NullApplier::default());

        cct.insert_resource(1, Priority::SystemLow, global_resource(code, 10)).unwrap();
        cct.insert_resource(2, Priority::SystemLow, global_resource(code, 20)).unwrap();
        cct.insert_resource(3, Priority::SystemLow, global_resource(code, 30)).unwrap();

        // lazy only ever applies the first arrival; later equal-priority
        // arrivals queue behind it untouched.
        assert_eq!(cct.applier.applied.len(), 1);
        assert_eq!(cct.applier.applied[0].1, vec![10]);
    }
}
