//! End-to-end: boot a `Daemon` over an in-memory kernel, submit a tune
//! through its ingress, watch the single CCT-consumer task apply it, untune
//! it, and confirm shutdown restores the pre-boot kernel value and cleans
//! up the restore file.

use std::sync::Arc;
use std::time::Duration;

use restuned::{Daemon, DaemonCatalogs};
use restuned_classifier::{
    AppConfigRegistry, ClassSignalIds, DefaultClassifier, FilterList, HookRegistry, InMemoryProcEventSource,
    RealProcFeatureSource,
};
use restuned_ipc::IngressPort;
use restuned_kernel::{InMemoryKernelApplier, KernelApplier};
use restuned_registry::{ResourceRegistry, SignalRegistry, TargetRegistry};
use restuned_types::{
    ApplyScope, DeviceMode, Permission, Policy, Priority, Request, RequestType, Resource, ResourceCode,
    ResourceConfig, SignalId, INDEFINITE,
};

fn placeholder_signals() -> ClassSignalIds {
    let id = SignalId { id: 0, sig_type: 0 };
    ClassSignalIds { app: id, browser: id, game: id, media: id }
}

#[tokio::test]
async fn tune_then_untune_round_trips_through_the_kernel() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = restuned_config::load(None).unwrap();
    config.restore_file_path = dir.path().join("restore.csv");

    let code = ResourceCode::new(5, 1);
    let resources = ResourceRegistry::new();
    resources.register(ResourceConfig {
        code,
        path: "/sys/fake/restuned-test".into(),
        apply_scope: ApplyScope::Global,
        policy: Policy::Instant,
        permission: Permission::System,
        modes: DeviceMode::RESUME,
        high_threshold: None,
        low_threshold: None,
        unit: None,
        default_value: 100,
    });

    let catalogs = DaemonCatalogs {
        resources,
        targets: TargetRegistry::new(),
        signals: SignalRegistry::new(),
        app_configs: AppConfigRegistry::new(),
        class_signals: placeholder_signals(),
        focused_cgroup_path: "/sys/fs/cgroup/restuned-focused".to_string(),
        filters: FilterList::load(None, None).unwrap(),
        hooks: HookRegistry::new(),
    };

    let kernel: Arc<dyn KernelApplier> = Arc::new(InMemoryKernelApplier::default());
    let mut daemon = Daemon::bootstrap(
        config,
        catalogs,
        kernel.clone(),
        Arc::new(RealProcFeatureSource::new()),
        Arc::new(DefaultClassifier),
        Box::new(InMemoryProcEventSource::new()),
    )
    .unwrap();

    let ingress = daemon.ingress();
    let tasks = daemon.run();

    let tune = Request::new(
        0,
        RequestType::ResourceTune,
        Priority::SystemHigh,
        INDEFINITE,
        1234,
        1234,
        vec![Resource::new(code, vec![777])],
    );
    let handle = ingress.submit_request(&serde_json::to_vec(&tune).unwrap()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(kernel.read_knob("/sys/fake/restuned-test").unwrap(), "777");

    ingress.untune_request(handle).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(kernel.read_knob("/sys/fake/restuned-test").unwrap(), "100");

    daemon.shutdown(tasks).await.unwrap();
    assert!(!dir.path().join("restore.csv").exists());
}
