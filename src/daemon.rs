//! Assembles every crate in the workspace into one running process: the
//! CCT consumer, garbage collector, netlink pump and classifier worker
//! tasks, each racing its own work against a shared shutdown signal.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use restuned_cct::{Cct, CctHandle};
use restuned_classifier::{
    run_classifier_worker, spawn_netlink_pump, AppConfigRegistry, ClassSignalIds, ClassifierConfig,
    ClassifierQueue, ContextualClassifier, FilterList, HookRegistry, ProcEventSource, ProcFeatureSource,
    TextClassifier,
};
use restuned_config::DaemonConfig;
use restuned_ipc::InProcessIngress;
use restuned_kernel::{KernelApplier, KernelResourceApplier};
use restuned_lifecycle::{AdmissionVerifier, GarbageCollector, RequestLifecycle, RequestQueue, TimerWheel, Verifier};
use restuned_registry::{ResourceRegistry, RestoreEntry, RestoreFile, SignalRegistry, TargetRegistry};
use restuned_types::{ApplyScope, Handle, RequestType, Resource, INDEFINITE};

use crate::error::Result;

/// Catalog data `restuned-config` explicitly leaves for an external
/// collaborator to parse: the resource/target/signal registries and the
/// classifier's per-app configuration. A real boot populates these from
/// YAML before building a [`Daemon`]; embedders and tests build them
/// directly.
pub struct DaemonCatalogs {
    pub resources: ResourceRegistry,
    pub targets: TargetRegistry,
    pub signals: SignalRegistry,
    pub app_configs: AppConfigRegistry,
    pub class_signals: ClassSignalIds,
    pub focused_cgroup_path: String,
    pub filters: FilterList,
    pub hooks: HookRegistry,
}

/// Owns every long-running task and the shutdown broadcast that tells them
/// all to drain.
pub struct Daemon {
    lifecycle: Arc<RequestLifecycle>,
    ingress: Arc<InProcessIngress>,
    timers: Arc<TimerWheel>,
    restore_file: RestoreFile,
    default_cache: Vec<RestoreEntry>,
    kernel: Arc<dyn KernelApplier>,
    cct: Option<Cct<KernelResourceApplier>>,
    classifier: Arc<ContextualClassifier>,
    classifier_queue: Arc<ClassifierQueue>,
    event_source: Option<Box<dyn ProcEventSource>>,
    proc_root: PathBuf,
    gc: Option<GarbageCollector>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Daemon {
    #[allow(clippy::too_many_arguments)]
    pub fn bootstrap(
        config: DaemonConfig,
        catalogs: DaemonCatalogs,
        kernel: Arc<dyn KernelApplier>,
        feature_source: Arc<dyn ProcFeatureSource>,
        text_classifier: Arc<dyn TextClassifier>,
        event_source: Box<dyn ProcEventSource>,
    ) -> Result<Daemon> {
        let restore_file = RestoreFile::new(config.restore_file_path.clone());
        let replay_kernel = kernel.clone();
        let restored = restore_file.replay_and_delete(move |path, value| {
            replay_kernel
                .write_knob(path, &value.to_string())
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        info!(restored, "replayed default-value restore file on startup");

        let default_cache = snapshot_defaults(&catalogs.resources, &catalogs.targets, kernel.as_ref());

        let queue = Arc::new(RequestQueue::new(config.queue_capacity_per_level));
        let lifecycle = Arc::new(RequestLifecycle::new(queue));

        let verifier: Arc<dyn Verifier> =
            Arc::new(AdmissionVerifier::new(catalogs.resources.clone(), catalogs.targets.clone()));
        let ingress = Arc::new(InProcessIngress::new(lifecycle.clone(), verifier));

        let applier = KernelResourceApplier::new(kernel.clone());
        let cct = Cct::new(catalogs.resources.clone(), catalogs.targets.clone(), applier);

        let timers = TimerWheel::new();
        let gc = GarbageCollector::new(lifecycle.clone())
            .with_interval(Duration::from_secs(config.gc_interval_secs))
            .with_batch_size(config.gc_batch_size);

        let classifier_queue = Arc::new(ClassifierQueue::new(config.classifier_queue_depth));
        let classifier = Arc::new(ContextualClassifier::new(
            ClassifierConfig {
                focused_cgroup_path: catalogs.focused_cgroup_path,
                class_signals: catalogs.class_signals,
            },
            catalogs.filters,
            catalogs.app_configs,
            catalogs.hooks,
            catalogs.signals,
            lifecycle.clone(),
            kernel.clone(),
            feature_source,
            text_classifier,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Daemon {
            lifecycle,
            ingress,
            timers,
            restore_file,
            default_cache,
            kernel,
            cct: Some(cct),
            classifier,
            classifier_queue,
            event_source: Some(event_source),
            proc_root: PathBuf::from("/proc"),
            gc: Some(gc),
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn ingress(&self) -> Arc<InProcessIngress> {
        self.ingress.clone()
    }

    pub fn lifecycle(&self) -> Arc<RequestLifecycle> {
        self.lifecycle.clone()
    }

    /// Spawn the CCT consumer, garbage collector, netlink pump and
    /// classifier worker. Panics if called more than once on the same
    /// `Daemon` — the CCT and event source are single-owner resources.
    pub fn run(&mut self) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();

        let cct = self.cct.take().expect("Daemon::run called more than once");
        tasks.push(tokio::spawn(run_cct_consumer(
            cct,
            self.lifecycle.clone(),
            self.timers.clone(),
            self.shutdown_rx.clone(),
        )));

        if let Some(gc) = self.gc.take() {
            let mut shutdown = self.shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                tokio::select! {
                    _ = gc.run() => {},
                    _ = shutdown.changed() => {},
                }
            }));
        }

        if let Some(source) = self.event_source.take() {
            tasks.push(spawn_netlink_pump(source, self.classifier_queue.clone(), self.shutdown_rx.clone()));
        }

        tasks.push(tokio::spawn(run_classifier_worker(
            self.classifier.clone(),
            self.classifier_queue.clone(),
            self.proc_root.clone(),
            self.shutdown_rx.clone(),
        )));

        tasks
    }

    /// Broadcast shutdown, restore every registered resource's kernel
    /// default from the snapshot taken at boot, re-emit then delete the
    /// restore file, then give every task up to one second to notice and
    /// exit.
    pub async fn shutdown(&self, tasks: Vec<JoinHandle<()>>) -> Result<()> {
        let _ = self.shutdown_tx.send(true);

        self.restore_file.emit(&self.default_cache)?;
        for entry in &self.default_cache {
            if let Err(e) = self.kernel.write_knob(&entry.path, &entry.default_value.to_string()) {
                warn!(path = %entry.path, error = %e, "failed to restore default on shutdown");
            }
        }
        self.restore_file.delete_if_present()?;

        let deadline = tokio::time::sleep(Duration::from_secs(1));
        tokio::pin!(deadline);
        for task in tasks {
            tokio::select! {
                _ = task => {},
                _ = &mut deadline => break,
            }
        }
        Ok(())
    }
}

/// The one task permitted to mutate the CCT. Tracks which `CctHandle`s
/// came from which tune's `Handle` so a later untune — which carries a
/// freshly issued handle of its own — can find them via `origin_handle`.
async fn run_cct_consumer(
    mut cct: Cct<KernelResourceApplier>,
    lifecycle: Arc<RequestLifecycle>,
    timers: Arc<TimerWheel>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut applied: HashMap<Handle, Vec<CctHandle>> = HashMap::new();
    loop {
        let request = tokio::select! {
            req = lifecycle.queue().dequeue() => req,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        match request.request_type {
            RequestType::ResourceTune | RequestType::SignalTune => {
                let mut handles = Vec::with_capacity(request.resources.len());
                for resource in request.resources.iter().cloned() {
                    match cct.insert_resource(request.handle, request.priority, resource) {
                        Ok(h) => handles.push(h),
                        Err(e) => {
                            warn!(handle = request.handle, error = %e, "resource insert failed, dropping this resource")
                        }
                    }
                }
                applied.insert(request.handle, handles);

                if request.duration != INDEFINITE && request.duration >= 0 {
                    let timer_lifecycle = lifecycle.clone();
                    let handle = request.handle;
                    timers.arm(handle, Duration::from_millis(request.duration as u64), move || {
                        timer_lifecycle.expire(handle);
                    });
                }
            }
            RequestType::ResourceUntune | RequestType::SignalUntune => {
                let Some(origin) = request.origin_handle else {
                    warn!(handle = request.handle, "untune request missing its origin handle, dropping");
                    continue;
                };
                timers.cancel(origin);
                if let Some(handles) = applied.remove(&origin) {
                    for cct_handle in handles {
                        if let Err(e) = cct.remove_resource(cct_handle) {
                            warn!(handle = origin, error = %e, "cct removal failed");
                        }
                    }
                }
                lifecycle.retire(origin);
            }
            RequestType::PropGet => {
                warn!(handle = request.handle, "propGet does not belong on the cct queue, dropping");
            }
        }
    }
}

/// Read every registered resource's current kernel value, at every
/// materialized scope coordinate, before the daemon makes its first
/// change — the in-memory cache `shutdown` later re-emits to the restore
/// file and writes straight back.
fn snapshot_defaults(resources: &ResourceRegistry, targets: &TargetRegistry, kernel: &dyn KernelApplier) -> Vec<RestoreEntry> {
    let mut entries = Vec::new();
    for code in resources.all_codes() {
        let Ok(config) = resources.get(code) else { continue };
        let paths: Vec<String> = match config.apply_scope {
            ApplyScope::Global => vec![KernelResourceApplier::path_for(&config, &Resource::new(code, vec![]))],
            ApplyScope::Core => (0..targets.total_core_count())
                .map(|core| {
                    let mut resource = Resource::new(code, vec![]);
                    resource.info.logical_core = Some(core);
                    KernelResourceApplier::path_for(&config, &resource)
                })
                .collect(),
            ApplyScope::Cluster => targets
                .cluster_ids()
                .into_iter()
                .map(|cluster| {
                    let mut resource = Resource::new(code, vec![]);
                    resource.info.logical_cluster = Some(cluster);
                    KernelResourceApplier::path_for(&config, &resource)
                })
                .collect(),
            ApplyScope::Cgroup => targets
                .cgroup_ids()
                .into_iter()
                .map(|id| KernelResourceApplier::path_for(&config, &Resource::new(code, vec![id])))
                .collect(),
        };

        for path in paths {
            let value = kernel.read_knob(&path).ok().and_then(|s| s.parse::<i32>().ok()).unwrap_or(config.default_value);
            entries.push(RestoreEntry { path, default_value: value });
        }
    }
    entries
}
