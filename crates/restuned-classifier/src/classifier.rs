use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use restuned_kernel::KernelApplier;
use restuned_lifecycle::{AlwaysVerified, RequestLifecycle};
use restuned_registry::SignalRegistry;
use restuned_types::{Handle, Priority, Request, RequestType, Signal, SignalId};

use crate::app_config::AppConfigRegistry;
use crate::error::Result;
use crate::features::{extract_features, ProcFeatureSource};
use crate::filters::FilterList;
use crate::hooks::HookRegistry;
use crate::text_classifier::{Classification, TextClassifier};

/// Base signal id dispatched per workload class.
#[derive(Debug, Clone, Copy)]
pub struct ClassSignalIds {
    pub app: SignalId,
    pub browser: SignalId,
    pub game: SignalId,
    pub media: SignalId,
}

impl ClassSignalIds {
    fn for_class(&self, class: Classification) -> Option<SignalId> {
        match class {
            Classification::App => Some(self.app),
            Classification::Browser => Some(self.browser),
            Classification::Game => Some(self.game),
            Classification::Media => Some(self.media),
            Classification::Ignore => None,
        }
    }
}

pub struct ClassifierConfig {
    pub focused_cgroup_path: String,
    pub class_signals: ClassSignalIds,
}

fn flatten(signals: Vec<Signal>) -> Vec<restuned_types::Resource> {
    signals.into_iter().flat_map(|s| s.resources).collect()
}

/// Orchestrates the `appOpen`/`appClose` pipeline: classify, untune the
/// outgoing foreground app, move the incoming one into the focused cgroup,
/// expand its signal, and submit a tune at
/// `SYSTEM_HIGH`. Holds no event-source state itself; [`crate::worker`]
/// drives this from whatever [`crate::event_source::ProcEventSource`] feeds it.
pub struct ContextualClassifier {
    config: ClassifierConfig,
    filters: FilterList,
    app_configs: AppConfigRegistry,
    hooks: HookRegistry,
    signals: SignalRegistry,
    lifecycle: Arc<RequestLifecycle>,
    kernel: Arc<dyn KernelApplier>,
    feature_source: Arc<dyn ProcFeatureSource>,
    text_classifier: Arc<dyn TextClassifier>,
    foreground_handles: Mutex<Vec<Handle>>,
}

impl ContextualClassifier {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ClassifierConfig,
        filters: FilterList,
        app_configs: AppConfigRegistry,
        hooks: HookRegistry,
        signals: SignalRegistry,
        lifecycle: Arc<RequestLifecycle>,
        kernel: Arc<dyn KernelApplier>,
        feature_source: Arc<dyn ProcFeatureSource>,
        text_classifier: Arc<dyn TextClassifier>,
    ) -> Self {
        ContextualClassifier {
            config,
            filters,
            app_configs,
            hooks,
            signals,
            lifecycle,
            kernel,
            feature_source,
            text_classifier,
            foreground_handles: Mutex::new(Vec::new()),
        }
    }

    /// Steps 1-8 of the `appOpen` pipeline. Returns the handles submitted
    /// for this pid, or `Ok(vec![])` if the pid was filtered, unclassifiable
    /// comm, or classified as `ignore`.
    #[instrument(skip(self))]
    pub fn handle_app_open(&self, pid: i32, tid: i32) -> Result<Vec<Handle>> {
        // Step 1: read comm; drop if absent.
        let comm = match self.feature_source.comm(pid) {
            Some(raw) => raw.trim().to_string(),
            None => {
                warn!(pid, "no comm available, dropping appOpen");
                return Ok(Vec::new());
            }
        };

        if !self.filters.permits(&comm) {
            return Ok(Vec::new());
        }

        // Step 2: classify; drop on ignore. Inference failure is folded into
        // `app` by whichever TextClassifier is wired in — this layer only
        // sees the final verdict.
        let feature_text = extract_features(pid, self.feature_source.as_ref());
        let class = self.text_classifier.classify(&feature_text);
        let base_signal_id = match self.config.class_signals.for_class(class) {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        // Step 4: untune the outgoing foreground app before bringing in the
        // new one.
        self.untune_foreground();

        let mut handles = Vec::new();
        let app_config = self.app_configs.get(&comm);

        // Step 5: move the new pid into the focused cgroup, plus any named
        // app threads into their configured cgroups. Each move is tracked
        // as its own request so it gets untuned alongside the focus tune
        // on the next app switch.
        handles.extend(self.move_pid(pid, tid, &self.config.focused_cgroup_path));
        if let Some(app_config) = &app_config {
            for thread in &app_config.threads {
                handles.extend(self.move_pid(pid, tid, &thread.cgroup_id.to_string()));
            }
        }

        // Step 6: run the per-app post-processing hook, if any.
        let (sig_id, sig_type) = self.hooks.apply(&comm, pid, base_signal_id.id, base_signal_id.sig_type);
        let resolved_id = SignalId { id: sig_id, sig_type };

        // Step 7: expand the (possibly rewritten) signal and submit.
        let signals = self.signals.resolve_with_derivatives(resolved_id)?;
        let duration = signals.first().map(|s| s.timeout_ms).unwrap_or(restuned_types::INDEFINITE);
        let resources = flatten(signals);

        let request = Request::new(0, RequestType::SignalTune, Priority::SystemHigh, duration, pid, tid, resources);
        let handle = self.lifecycle.submit(request, true, &AlwaysVerified)?;
        handles.push(handle);

        // Step 7b: pull in any signals this app's config associates with it,
        // on top of its workload-class base signal.
        if let Some(app_config) = &app_config {
            for &code in &app_config.signal_codes {
                let extra_signals = self.signals.resolve_with_derivatives(SignalId { id: code, sig_type: 0 })?;
                let extra_duration = extra_signals.first().map(|s| s.timeout_ms).unwrap_or(restuned_types::INDEFINITE);
                let extra_resources = flatten(extra_signals);
                let extra_request =
                    Request::new(0, RequestType::SignalTune, Priority::SystemHigh, extra_duration, pid, tid, extra_resources);
                handles.push(self.lifecycle.submit(extra_request, true, &AlwaysVerified)?);
            }
        }

        info!(pid, comm = %comm, ?class, handle, "classified and submitted focus tune");

        // Step 8: remember every handle submitted for this pid for the next
        // event's step 4.
        *self.foreground_handles.lock() = handles.clone();
        Ok(handles)
    }

    /// Perform a cgroup move for `pid` and submit a tracking request through
    /// the lifecycle (no CCT resource is attached — the move already
    /// happened directly) so it gets untuned alongside the rest of this
    /// focus event's handles on the next switch.
    fn move_pid(&self, pid: i32, tid: i32, cgroup_path: &str) -> Option<Handle> {
        if let Err(e) = self.kernel.move_to_cgroup(cgroup_path, pid) {
            warn!(pid, cgroup_path, error = %e, "failed to move pid into cgroup");
            return None;
        }
        let request = Request::new(0, RequestType::ResourceTune, Priority::SystemLow, restuned_types::INDEFINITE, pid, tid, vec![]);
        match self.lifecycle.submit(request, true, &AlwaysVerified) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(pid, cgroup_path, error = %e, "failed to track cgroup move");
                None
            }
        }
    }

    /// `appClose`: hand the pid to the garbage collector's synthesis path
    /// (every handle the lifecycle still tracks for this pid gets untuned)
    /// and drop local tracking state.
    #[instrument(skip(self))]
    pub fn handle_app_close(&self, pid: i32) -> Vec<Handle> {
        self.lifecycle.client_died(pid)
    }

    fn untune_foreground(&self) {
        let handles = std::mem::take(&mut *self.foreground_handles.lock());
        for handle in handles {
            self.lifecycle.expire(handle);
        }
    }
}
