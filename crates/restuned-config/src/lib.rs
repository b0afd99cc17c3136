//! Daemon-level configuration: queue sizing, timer/GC tuning, and the paths
//! the daemon reads its resource/target/classifier config from.
//!
//! Those resource/target/classifier YAML files are themselves out of this
//! crate's scope (an external collaborator parses them) — this crate only
//! owns the small set of settings the daemon binary itself needs to start,
//! loaded with the same env > file > defaults hierarchy the rest of the
//! workspace's ambient config follows.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    /// Capacity of each priority level in the request intake queue.
    pub queue_capacity_per_level: usize,
    /// GC sweep interval, seconds.
    pub gc_interval_secs: u64,
    /// Max tracked pids inspected per GC pass.
    pub gc_batch_size: usize,
    /// Depth of the classifier's netlink-event queue before front-trimming.
    pub classifier_queue_depth: usize,
    /// Path to the CSV default-value restore file.
    pub restore_file_path: PathBuf,
    /// Directory holding the resource/target/classifier YAML config this
    /// crate does not itself parse.
    pub config_dir: PathBuf,
    /// Whether to run attached to a terminal instead of daemonizing.
    pub foreground: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            queue_capacity_per_level: 256,
            gc_interval_secs: 83,
            gc_batch_size: 20,
            classifier_queue_depth: 30,
            restore_file_path: PathBuf::from("/var/lib/restuned/restore.csv"),
            config_dir: PathBuf::from("/etc/restuned"),
            foreground: false,
        }
    }
}

/// Load configuration with the standard hierarchy: environment variables
/// prefixed `RESTUNED_` win over `config_path` (if it exists) win over
/// [`DaemonConfig::default`].
pub fn load(config_path: Option<&std::path::Path>) -> Result<DaemonConfig> {
    let defaults = DaemonConfig::default();
    let mut builder = config::Config::builder().add_source(config::Config::try_from(&defaults)?);

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("RESTUNED").separator("_").try_parsing(true),
    );

    let built = builder.build()?;
    Ok(built.try_deserialize()?)
}
