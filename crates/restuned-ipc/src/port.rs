use async_trait::async_trait;

use restuned_types::{DurationMs, Handle};

use crate::error::Result;

/// The client/ingress contract a wire listener sits in front of. No codec
/// lives in this crate: `submit_request` takes an already-encoded request
/// and hands back a caller-facing handle or error, matching the boundary
/// the daemon draws between "bytes off a socket" and "a validated request".
#[async_trait]
pub trait IngressPort: Send + Sync {
    /// Decode `encoded` into a request and submit it for arbitration.
    async fn submit_request(&self, encoded: &[u8]) -> Result<Handle>;

    /// Request early teardown of an active tune.
    async fn untune_request(&self, handle: Handle) -> Result<()>;

    /// Extend or shorten (never below the originally-scheduled duration,
    /// unless made indefinite) an active tune's remaining lifetime.
    async fn update_duration(&self, handle: Handle, new_millis: DurationMs) -> Result<()>;

    /// Look up a daemon property by name, falling back to `default` if unset.
    fn get_property(&self, name: &str, default: &str) -> String;
}
