use restuned_registry::TargetRegistry;
use restuned_types::{ApplyScope, Resource, ResourceCode, ResourceConfig};

use crate::error::{CctError, Result};

/// Number of scope coordinates a resource's table is sized for: 1 for
/// global, `coreCount`/`clusterCount`/`cgroupCount` otherwise.
pub(crate) fn group_count(apply_scope: ApplyScope, target_registry: &TargetRegistry) -> usize {
    match apply_scope {
        ApplyScope::Global => 1,
        ApplyScope::Core => target_registry.total_core_count().max(1) as usize,
        ApplyScope::Cluster => target_registry.total_cluster_count().max(1),
        ApplyScope::Cgroup => target_registry.cgroup_ids().len().max(1),
    }
}

/// Resolve the scope coordinate (group index within a resource's table) a
/// tune targets. Logical→physical translation for core/cluster goes through
/// `TargetRegistry`; unmapped coordinates are rejected.
pub(crate) fn resolve_coordinate(
    config: &ResourceConfig,
    resource: &Resource,
    target_registry: &TargetRegistry,
) -> Result<usize> {
    match config.apply_scope {
        ApplyScope::Global => Ok(0),
        ApplyScope::Core => {
            let logical_cluster = resource.info.logical_cluster.unwrap_or(0);
            let logical_core = resource.info.logical_core.ok_or(CctError::UnresolvedCoordinate(config.code))?;
            let physical_core = target_registry
                .physical_core_id(logical_cluster, logical_core)
                .map_err(|_| CctError::UnresolvedCoordinate(config.code))?;
            Ok(physical_core as usize)
        }
        ApplyScope::Cluster => {
            let logical_cluster = resource.info.logical_cluster.ok_or(CctError::UnresolvedCoordinate(config.code))?;
            let physical_cluster = target_registry
                .physical_cluster_id(logical_cluster)
                .map_err(|_| CctError::UnresolvedCoordinate(config.code))?;
            let flat = target_registry
                .cluster_ids()
                .iter()
                .position(|id| *id == physical_cluster)
                .ok_or(CctError::UnresolvedCoordinate(config.code))?;
            Ok(flat)
        }
        ApplyScope::Cgroup => {
            let cgroup_id = resource.values.first().copied().ok_or(CctError::UnresolvedCoordinate(config.code))?;
            target_registry
                .cgroup_ids()
                .iter()
                .position(|id| *id == cgroup_id)
                .ok_or(CctError::UnresolvedCoordinate(config.code))
        }
    }
}

pub(crate) fn unknown_resource(code: ResourceCode) -> CctError {
    CctError::UnknownResource(code)
}
