//! Exercises the target/resource/cgroup catalogs together the way a
//! daemon boot assembles them, rather than each registry in isolation.

use restuned_registry::{ResourceRegistry, TargetRegistry};
use restuned_types::{ApplyScope, CGroupConfig, ClusterInfo, DeviceMode, Permission, Policy, ResourceCode, ResourceConfig};

fn cpu_freq_config(code: ResourceCode) -> ResourceConfig {
    ResourceConfig {
        code,
        path: "/sys/devices/system/cpu/cpu%core%/cpufreq/scaling_max_freq".into(),
        apply_scope: ApplyScope::Core,
        policy: Policy::HigherBetter,
        permission: Permission::System,
        modes: DeviceMode::RESUME,
        high_threshold: Some(3_000_000),
        low_threshold: Some(200_000),
        unit: Some("khz".into()),
        default_value: 2_000_000,
    }
}

#[test]
fn installed_topology_resolves_core_ids_for_every_cluster() {
    let targets = TargetRegistry::new();
    targets.install_topology(vec![
        ClusterInfo { physical_id: 0, start_cpu: 0, num_cpus: 4, capacity: 100 },
        ClusterInfo { physical_id: 1, start_cpu: 4, num_cpus: 4, capacity: 170 },
    ]);

    assert_eq!(targets.total_cluster_count(), 2);
    assert_eq!(targets.physical_core_id(0, 3).unwrap(), 2);
    assert_eq!(targets.physical_core_id(1, 1).unwrap(), 4);
    assert_eq!(targets.physical_core_id(1, 2).unwrap(), 5);
    assert!(targets.physical_core_id(1, 0).is_err());
    assert!(targets.physical_core_id(2, 0).is_err());
}

/// Builds a fake `cpufreq/policy*` sysfs tree with two clusters — a
/// low-capacity `policy0` (cpus 0-3) and a high-capacity `policy1` (cpus
/// 4-7) — and runs the real discovery fallback chain against it, the way
/// `main` runs it against `/sys` at boot.
#[test]
fn discover_at_assigns_logical_ids_by_ascending_capacity() {
    let root = tempfile::tempdir().unwrap();
    let cpu_root = root.path().join("cpu");
    let policy_root = cpu_root.join("cpufreq");
    std::fs::create_dir_all(&policy_root).unwrap();

    for (policy, cpus, capacity) in [("policy0", [0, 1, 2, 3], 100), ("policy1", [4, 5, 6, 7], 200)] {
        let dir = policy_root.join(policy);
        std::fs::create_dir_all(&dir).unwrap();
        let cpu_list = cpus.iter().map(i32::to_string).collect::<Vec<_>>().join(" ");
        std::fs::write(dir.join("related_cpus"), cpu_list).unwrap();
        for cpu in cpus {
            let cpu_dir = cpu_root.join(format!("cpu{cpu}"));
            std::fs::create_dir_all(&cpu_dir).unwrap();
            std::fs::write(cpu_dir.join("cpu_capacity"), capacity.to_string()).unwrap();
        }
    }
    std::fs::write(cpu_root.join("online"), "0-7").unwrap();

    let targets = TargetRegistry::new();
    targets.discover_at(
        policy_root.to_str().unwrap(),
        cpu_root.to_str().unwrap(),
        cpu_root.join("online").to_str().unwrap(),
    );

    assert_eq!(targets.total_core_count(), 8);
    assert_eq!(targets.total_cluster_count(), 2);
    // policy0 is the lowest-capacity cluster, so it gets logical id 0.
    assert_eq!(targets.physical_cluster_id(0).unwrap(), 0);
    assert_eq!(targets.physical_cluster_id(1).unwrap(), 1);
    // Scenario: the second (higher-capacity) cluster starts at cpu 4, so
    // its second logical core is physical cpu 5.
    assert_eq!(targets.physical_core_id(1, 2).unwrap(), 5);
}

#[test]
fn resource_registry_and_target_registry_cooperate_on_scope() {
    let resources = ResourceRegistry::new();
    let code = ResourceCode::new(1, 7);
    resources.register(cpu_freq_config(code));

    let targets = TargetRegistry::new();
    targets.install_topology(vec![ClusterInfo { physical_id: 0, start_cpu: 0, num_cpus: 8, capacity: 100 }]);

    let config = resources.get(code).unwrap();
    assert_eq!(config.apply_scope, ApplyScope::Core);
    assert!(config.within_bounds(2_500_000));
    assert!(!config.within_bounds(3_500_000));

    // A core-scoped resource is materialized once per physical core, not
    // once per cluster — registries only provide the coordinates, scope
    // substitution itself lives in restuned-kernel.
    assert_eq!(targets.physical_cluster_id(0).unwrap(), 0);
}

#[test]
fn cgroup_catalog_tracks_every_registered_id() {
    let targets = TargetRegistry::new();
    targets.register_cgroup(CGroupConfig { name: "foreground".into(), id: 1, creation_needed: true, threaded: false });
    targets.register_cgroup(CGroupConfig { name: "background".into(), id: 2, creation_needed: true, threaded: true });

    let mut ids = targets.cgroup_ids();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(targets.cgroup(1).unwrap().name, "foreground");
    assert!(targets.cgroup(99).is_err());
}
