use dashmap::DashMap;
use std::sync::Arc;

/// A single named thread an app spawns that needs its own cgroup placement,
/// e.g. a browser's GPU process thread going to a different cgroup than its
/// main process.
#[derive(Debug, Clone)]
pub struct AppThread {
    pub comm: String,
    pub cgroup_id: i32,
}

/// Per-application configuration: extra thread placements plus the signal
/// codes this app should pull in alongside its workload-class base signal.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub threads: Vec<AppThread>,
    pub signal_codes: Vec<u32>,
}

/// Catalog of per-app configuration, keyed by the main process `comm`.
#[derive(Clone, Default)]
pub struct AppConfigRegistry {
    apps: Arc<DashMap<String, AppConfig>>,
}

impl AppConfigRegistry {
    pub fn new() -> Self {
        AppConfigRegistry::default()
    }

    pub fn register(&self, comm: impl Into<String>, config: AppConfig) {
        self.apps.insert(comm.into(), config);
    }

    pub fn get(&self, comm: &str) -> Option<AppConfig> {
        self.apps.get(comm).map(|e| e.value().clone())
    }
}
