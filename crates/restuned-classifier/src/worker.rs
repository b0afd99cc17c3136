use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use restuned_types::{ProcEvent, ProcEventKind};

use crate::classifier::ContextualClassifier;
use crate::classifier_queue::ClassifierQueue;
use crate::event_source::ProcEventSource;

/// Parse the 7th whitespace-delimited field after the closing `)` of
/// `/proc/<pid>/stat`'s `comm` — the controlling-terminal device number. `0`
/// means the process has none (a daemon); anything else means it does.
/// Mirrors `procHasControlTerminal` in the source's netlink reader.
fn has_controlling_terminal(stat: &str) -> bool {
    let Some(close) = stat.rfind(')') else {
        return false;
    };
    let rest = stat[close + 1..].trim_start();
    // Fields after comm: state ppid pgrp session tty_nr ...
    match rest.split_whitespace().nth(4) {
        Some(tty) => tty.parse::<i64>().map(|n| n != 0).unwrap_or(false),
        None => false,
    }
}

fn pid_exists(proc_root: &Path, pid: i32) -> bool {
    proc_root.join(pid.to_string()).exists()
}

/// Event-intake gate shared by both `appOpen` and `appClose`: the pid must
/// still be present in `/proc`, and an `appOpen` must additionally have a
/// controlling terminal.
fn should_process(proc_root: &Path, event: &ProcEvent) -> bool {
    if !pid_exists(proc_root, event.pid) {
        return false;
    }
    if event.kind == ProcEventKind::AppOpen {
        let stat_path = proc_root.join(event.pid.to_string()).join("stat");
        let stat = std::fs::read_to_string(stat_path).unwrap_or_default();
        return has_controlling_terminal(&stat);
    }
    true
}

/// Reads `source` on a blocking task, forever, pushing every event onto
/// `queue`. Matches the source's single netlink thread; run via
/// `spawn_blocking` because the underlying recv is a blocking syscall, not
/// because the classifier's own concurrency model wants OS threads.
pub fn spawn_netlink_pump(
    mut source: Box<dyn ProcEventSource>,
    queue: Arc<ClassifierQueue>,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        if let Err(e) = source.set_listen(true) {
            error!(error = %e, "failed to enable process-event multicast listen");
            return;
        }
        loop {
            if *shutdown.borrow() {
                break;
            }
            match source.recv_event() {
                Ok(Some(event)) => queue.push(event),
                Ok(None) => {
                    info!("process-event source closed, netlink pump exiting");
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(error = %e, "process-event source recv failed, netlink pump exiting");
                    break;
                }
            }
        }
        let _ = source.set_listen(false);
    })
}

/// Drains `queue`, applying the intake gate and then the classifier
/// pipeline, until told to shut down.
pub async fn run_classifier_worker(
    classifier: Arc<ContextualClassifier>,
    queue: Arc<ClassifierQueue>,
    proc_root: PathBuf,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            event = queue.pop() => event,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        if event.kind == ProcEventKind::Ignore {
            continue;
        }
        if !should_process(&proc_root, &event) {
            continue;
        }

        match event.kind {
            ProcEventKind::AppOpen => {
                if let Err(e) = classifier.handle_app_open(event.pid, event.tgid) {
                    warn!(pid = event.pid, error = %e, "appOpen pipeline failed, dropping event");
                }
            }
            ProcEventKind::AppClose => {
                classifier.handle_app_close(event.pid);
            }
            ProcEventKind::Ignore => unreachable!(),
        }
    }
}
