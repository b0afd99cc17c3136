use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::instrument;

use restuned_lifecycle::{RequestLifecycle, Verifier};
use restuned_types::{DurationMs, Handle, Request};

use crate::error::{IpcError, Result};
use crate::port::IngressPort;

/// In-process stand-in for a wire listener: `submit_request` decodes its
/// bytes with `serde_json` rather than any real framing, and every call
/// talks straight to a [`RequestLifecycle`] in the same address space. Used
/// by the daemon's own integration tests and by anything embedding
/// `restuned` as a library instead of running it as a socket-facing daemon.
pub struct InProcessIngress {
    lifecycle: Arc<RequestLifecycle>,
    verifier: Arc<dyn Verifier>,
    properties: DashMap<String, String>,
}

impl InProcessIngress {
    pub fn new(lifecycle: Arc<RequestLifecycle>, verifier: Arc<dyn Verifier>) -> Self {
        InProcessIngress { lifecycle, verifier, properties: DashMap::new() }
    }

    pub fn set_property(&self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }
}

#[async_trait]
impl IngressPort for InProcessIngress {
    #[instrument(skip(self, encoded))]
    async fn submit_request(&self, encoded: &[u8]) -> Result<Handle> {
        let request: Request = serde_json::from_slice(encoded).map_err(|e| IpcError::Decode(e.to_string()))?;
        let handle = self.lifecycle.submit(request, false, self.verifier.as_ref())?;
        Ok(handle)
    }

    #[instrument(skip(self))]
    async fn untune_request(&self, handle: Handle) -> Result<()> {
        self.lifecycle.expire(handle).ok_or(IpcError::UnknownHandle(handle))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_duration(&self, handle: Handle, new_millis: DurationMs) -> Result<()> {
        self.lifecycle.update_duration(handle, new_millis)?;
        Ok(())
    }

    fn get_property(&self, name: &str, default: &str) -> String {
        self.properties.get(name).map(|v| v.clone()).unwrap_or_else(|| default.to_string())
    }
}
