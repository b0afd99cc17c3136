use std::collections::HashMap;
use std::fs;
use std::path::Path;

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use restuned_types::{CGroupConfig, ClusterInfo};

use crate::error::{RegistryError, Result};

const POLICY_DIR_PATH: &str = "/sys/devices/system/cpu/cpufreq";
const CPU_SYSFS_ROOT: &str = "/sys/devices/system/cpu";
const ONLINE_CPU_FILE_PATH: &str = "/sys/devices/system/cpu/online";

/// Target topology and cgroup catalog, populated once at startup by
/// [`TargetRegistry::discover`] and read thereafter.
///
/// Discovery tries three strategies in order, matching the source's
/// documented fallback chain:
/// 1. `cpufreq/policy*` directories (one policy per cluster on most targets).
/// 2. `topology/cluster_id` per online cpu.
/// 3. A single homogeneous cluster spanning every online cpu.
#[derive(Clone, Default)]
pub struct TargetRegistry {
    logical_to_physical_cluster: Arc<DashMap<i32, i32>>,
    physical_clusters: Arc<DashMap<i32, ClusterInfo>>,
    cgroups: Arc<DashMap<i32, CGroupConfig>>,
    total_core_count: Arc<parking_lot::RwLock<i32>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        TargetRegistry::default()
    }

    pub fn total_core_count(&self) -> i32 {
        *self.total_core_count.read()
    }

    pub fn total_cluster_count(&self) -> usize {
        self.physical_clusters.len()
    }

    pub fn cluster_info(&self, physical_cluster_id: i32) -> Option<ClusterInfo> {
        self.physical_clusters.get(&physical_cluster_id).map(|e| *e.value())
    }

    pub fn cluster_ids(&self) -> Vec<i32> {
        self.logical_to_physical_cluster.iter().map(|e| *e.value()).collect()
    }

    pub fn physical_cluster_id(&self, logical_cluster_id: i32) -> Result<i32> {
        self.logical_to_physical_cluster
            .get(&logical_cluster_id)
            .map(|e| *e.value())
            .ok_or(RegistryError::UnknownLogicalCluster(logical_cluster_id))
    }

    /// The nth (1-indexed) physical core in `logicalClusterId`, or
    /// `logicalCoreId` unchanged when the target is homogeneous (no clusters
    /// discovered).
    pub fn physical_core_id(&self, logical_cluster_id: i32, logical_core_id: i32) -> Result<i32> {
        if self.physical_clusters.is_empty() {
            return Ok(logical_core_id);
        }
        let physical_id = self.physical_cluster_id(logical_cluster_id)?;
        let cluster = self
            .physical_clusters
            .get(&physical_id)
            .ok_or(RegistryError::UnknownLogicalCluster(logical_cluster_id))?;
        if logical_core_id <= 0 || logical_core_id > cluster.num_cpus {
            return Err(RegistryError::InvalidLogicalCoreId {
                logical_cluster_id,
                logical_core_id,
                num_cpus: cluster.num_cpus,
            });
        }
        Ok(cluster.start_cpu + logical_core_id - 1)
    }

    pub fn register_cgroup(&self, config: CGroupConfig) {
        self.cgroups.insert(config.id, config);
    }

    pub fn cgroup(&self, id: i32) -> Result<CGroupConfig> {
        self.cgroups.get(&id).map(|e| e.value().clone()).ok_or(RegistryError::UnknownCgroup(id))
    }

    pub fn cgroup_ids(&self) -> Vec<i32> {
        self.cgroups.iter().map(|e| *e.key()).collect()
    }

    /// Run topology discovery against the live sysfs tree. Never fails: on
    /// total discovery failure the registry simply stays homogeneous
    /// (zero discovered clusters, core count read from `online`).
    pub fn discover(&self) {
        self.discover_at(POLICY_DIR_PATH, CPU_SYSFS_ROOT, ONLINE_CPU_FILE_PATH);
    }

    /// Same fallback chain as [`Self::discover`], against caller-supplied
    /// sysfs roots. Exists so tests can exercise the real discovery logic
    /// against a temporary directory tree instead of the live `/sys`.
    pub fn discover_at(&self, policy_dir_path: &str, cpu_sysfs_root: &str, online_cpu_file_path: &str) {
        *self.total_core_count.write() = read_online_cpu_count(online_cpu_file_path).unwrap_or(0);

        if let Some(policy_dirs) = list_policy_dirs(policy_dir_path) {
            if !policy_dirs.is_empty() {
                self.apply_policy_based_mapping(policy_dir_path, cpu_sysfs_root, policy_dirs);
                return;
            }
        }

        debug!("no cpufreq policy directories found, falling back to cluster_id mapping");
        self.apply_cluster_id_mapping(cpu_sysfs_root);
    }

    /// Test/embedded entry point bypassing sysfs: install a pre-computed
    /// topology directly (used by the homogeneous-device path in tests).
    pub fn install_topology(&self, clusters: Vec<ClusterInfo>) {
        self.physical_clusters.clear();
        self.logical_to_physical_cluster.clear();
        for (logical_id, cluster) in clusters.into_iter().enumerate() {
            self.physical_clusters.insert(cluster.physical_id, cluster);
            self.logical_to_physical_cluster.insert(logical_id as i32, cluster.physical_id);
        }
    }

    /// Logical cluster ids order clusters by ascending capacity (logical id
    /// 0 is the lowest-capacity cluster), matching the way the kernel's
    /// own `sched_mc` big.LITTLE numbering works.
    fn apply_policy_based_mapping(&self, policy_dir_path: &str, cpu_sysfs_root: &str, policy_dirs: Vec<String>) {
        self.physical_clusters.clear();
        self.logical_to_physical_cluster.clear();

        let mut candidates: Vec<(i32, i32, i32)> = policy_dirs
            .iter()
            .map(|dir_name| {
                let full_path = format!("{}/{}", policy_dir_path, dir_name);
                let cpu_list = read_related_cpus(&full_path).unwrap_or_default();
                let start_cpu = cpu_list.iter().copied().min().unwrap_or(0);
                let capacity =
                    cpu_list.first().map(|cpu| read_cpu_capacity(cpu_sysfs_root, *cpu)).unwrap_or(0);
                (capacity, start_cpu, cpu_list.len() as i32)
            })
            .collect();
        candidates.sort_by_key(|(capacity, start_cpu, _)| (*capacity, *start_cpu));

        for (logical_id, (capacity, start_cpu, num_cpus)) in candidates.into_iter().enumerate() {
            let physical_id = logical_id as i32;
            let cluster = ClusterInfo { physical_id, start_cpu, num_cpus, capacity };
            self.physical_clusters.insert(physical_id, cluster);
            self.logical_to_physical_cluster.insert(logical_id as i32, physical_id);
        }
    }

    fn apply_cluster_id_mapping(&self, cpu_sysfs_root: &str) {
        let Some(entries) = fs::read_dir(cpu_sysfs_root).ok() else {
            warn!("could not open {}, topology stays homogeneous", cpu_sysfs_root);
            return;
        };

        let mut cluster_to_cores: HashMap<i32, Vec<i32>> = HashMap::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(cpu_num) = name.strip_prefix("cpu").and_then(|n| n.parse::<i32>().ok()) else {
                continue;
            };
            let cluster_id_path = format!("{}/{}/topology/cluster_id", cpu_sysfs_root, name);
            if let Ok(raw) = fs::read_to_string(&cluster_id_path) {
                if let Ok(cluster_id) = raw.trim().parse::<i32>() {
                    cluster_to_cores.entry(cluster_id).or_default().push(cpu_num);
                }
            }
        }

        if cluster_to_cores.is_empty() {
            return;
        }

        self.physical_clusters.clear();
        self.logical_to_physical_cluster.clear();

        let mut by_capacity: Vec<(i32, i32, i32, i32)> = cluster_to_cores
            .into_iter()
            .map(|(cluster_id, cores)| {
                let start_cpu = cores.iter().copied().min().unwrap_or(0);
                let capacity = cores.first().map(|cpu| read_cpu_capacity(cpu_sysfs_root, *cpu)).unwrap_or(0);
                (capacity, cluster_id, start_cpu, cores.len() as i32)
            })
            .collect();
        by_capacity.sort_by_key(|(capacity, cluster_id, _, _)| (*capacity, *cluster_id));

        for (logical_id, (capacity, cluster_id, start_cpu, num_cpus)) in by_capacity.into_iter().enumerate() {
            let cluster = ClusterInfo { physical_id: cluster_id, start_cpu, num_cpus, capacity };
            self.physical_clusters.insert(cluster_id, cluster);
            self.logical_to_physical_cluster.insert(logical_id as i32, cluster_id);
        }
    }
}

fn read_online_cpu_count(online_cpu_file_path: &str) -> Option<i32> {
    let line = fs::read_to_string(online_cpu_file_path).ok()?;
    let mut max_cpu = 0i32;
    for token in line.trim().split(['-', ',']) {
        if let Ok(n) = token.trim().parse::<i32>() {
            max_cpu = max_cpu.max(n);
        }
    }
    Some(max_cpu + 1)
}

fn list_policy_dirs(root: &str) -> Option<Vec<String>> {
    let entries = fs::read_dir(root).ok()?;
    Some(
        entries
            .flatten()
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| name.starts_with("policy"))
            .collect(),
    )
}

fn read_related_cpus(policy_dir: &str) -> Option<Vec<i32>> {
    let path = Path::new(policy_dir).join("related_cpus");
    let raw = fs::read_to_string(path).ok()?;
    Some(raw.split_whitespace().filter_map(|t| t.parse().ok()).collect())
}

fn read_cpu_capacity(cpu_sysfs_root: &str, cpu: i32) -> i32 {
    let path = format!("{}/cpu{}/cpu_capacity", cpu_sysfs_root, cpu);
    fs::read_to_string(path).ok().and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homogeneous_target_passes_core_id_through() {
        let reg = TargetRegistry::new();
        assert_eq!(reg.physical_core_id(0, 3).unwrap(), 3);
    }

    #[test]
    fn installed_topology_resolves_physical_core() {
        let reg = TargetRegistry::new();
        reg.install_topology(vec![
            ClusterInfo { physical_id: 0, start_cpu: 0, num_cpus: 4, capacity: 100 },
            ClusterInfo { physical_id: 1, start_cpu: 4, num_cpus: 4, capacity: 200 },
        ]);
        assert_eq!(reg.physical_cluster_id(1).unwrap(), 1);
        assert_eq!(reg.physical_core_id(1, 2).unwrap(), 5);
    }

    #[test]
    fn physical_core_id_rejects_out_of_range_logical_core() {
        let reg = TargetRegistry::new();
        reg.install_topology(vec![ClusterInfo { physical_id: 0, start_cpu: 4, num_cpus: 4, capacity: 100 }]);
        assert!(reg.physical_core_id(0, 0).is_err());
        assert!(reg.physical_core_id(0, 5).is_err());
    }

    #[test]
    fn unmapped_logical_cluster_errors() {
        let reg = TargetRegistry::new();
        reg.install_topology(vec![ClusterInfo { physical_id: 0, start_cpu: 0, num_cpus: 4, capacity: 100 }]);
        assert!(reg.physical_cluster_id(5).is_err());
    }

    #[test]
    fn cgroup_roundtrip() {
        let reg = TargetRegistry::new();
        reg.register_cgroup(CGroupConfig { name: "background".into(), id: 7, creation_needed: true, threaded: false });
        assert_eq!(reg.cgroup(7).unwrap().name, "background");
        assert!(reg.cgroup(8).is_err());
    }
}
