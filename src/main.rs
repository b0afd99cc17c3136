use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use restuned::{Daemon, DaemonCatalogs};
use restuned_classifier::{
    AppConfigRegistry, ClassSignalIds, DefaultClassifier, FilterList, HookRegistry, ProcEventSource,
    RealProcFeatureSource,
};
use restuned_kernel::{KernelApplier, LinuxKernelApplier};
use restuned_registry::{ResourceRegistry, SignalRegistry, TargetRegistry};
use restuned_types::SignalId;

/// User-mode resource-tuning daemon: arbitrates concurrent tune/untune
/// requests against system, per-core, per-cluster and per-cgroup knobs.
#[derive(Parser)]
#[command(name = "restuned")]
#[command(version)]
struct Cli {
    /// Path to a TOML/YAML config file overriding daemon defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run attached to the current terminal instead of daemonizing.
    #[arg(long)]
    foreground: bool,

    /// Override the default-value restore file path.
    #[arg(long)]
    restore_file: Option<PathBuf>,
}

fn build_event_source() -> Box<dyn ProcEventSource> {
    #[cfg(target_os = "linux")]
    {
        match restuned_classifier::NetlinkProcEventSource::connect() {
            Ok(source) => return Box::new(source),
            Err(e) => {
                tracing::warn!(error = %e, "failed to open netlink process-event socket, falling back to an idle source");
            }
        }
    }
    Box::new(restuned_classifier::InMemoryProcEventSource::new())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    let mut config = restuned_config::load(cli.config.as_deref()).context("failed to load daemon configuration")?;
    if cli.foreground {
        config.foreground = true;
    }
    if let Some(path) = cli.restore_file {
        config.restore_file_path = path;
    }

    // Resource/target/signal catalogs and per-app classifier config are a
    // YAML-parsing concern this binary does not own (see restuned-config's
    // crate docs); a real deployment wires an external loader in here
    // before calling `Daemon::bootstrap`. This boot leaves them empty,
    // which degrades to "classify and log, tune nothing" rather than
    // failing to start.
    let resources = ResourceRegistry::new();
    let targets = TargetRegistry::new();
    targets.discover();
    let signals = SignalRegistry::new();
    let app_configs = AppConfigRegistry::new();

    let allow_path = config.config_dir.join("classifier-allow.txt");
    let block_path = config.config_dir.join("classifier-block.txt");
    let filters = FilterList::load(
        allow_path.exists().then_some(allow_path.as_path()),
        block_path.exists().then_some(block_path.as_path()),
    )
    .context("failed to load classifier filter lists")?;

    let placeholder_signal = SignalId { id: 0, sig_type: 0 };
    let catalogs = DaemonCatalogs {
        resources,
        targets,
        signals,
        app_configs,
        class_signals: ClassSignalIds {
            app: placeholder_signal,
            browser: placeholder_signal,
            game: placeholder_signal,
            media: placeholder_signal,
        },
        focused_cgroup_path: "/sys/fs/cgroup/restuned-focused".to_string(),
        filters,
        hooks: HookRegistry::new(),
    };

    let kernel: Arc<dyn KernelApplier> = Arc::new(LinuxKernelApplier);
    let feature_source = Arc::new(RealProcFeatureSource::new());
    let text_classifier = Arc::new(DefaultClassifier);
    let event_source = build_event_source();

    let mut daemon = Daemon::bootstrap(config, catalogs, kernel, feature_source, text_classifier, event_source)
        .context("failed to bootstrap daemon")?;

    info!("restuned starting");
    let tasks = daemon.run();

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("shutdown requested, draining");
    daemon.shutdown(tasks).await.context("error while shutting down")?;
    info!("restuned stopped");

    Ok(())
}
