//! Collaborator contract for network-backed lookups.

use crate::error::RequestResult;
use async_trait::async_trait;

/// A network lookup that produces exactly one result.
///
/// The engine drives `execute` on a worker task and hands the result back to
/// the dispatcher. Cancellation drops the in-flight future, so an
/// implementation must not produce side effects after its last `.await`.
#[async_trait]
pub trait NetworkService: Send + Sync {
    /// Payload produced on success.
    type Output: Send + 'static;

    /// Perform the lookup.
    async fn execute(&self) -> RequestResult<Self::Output>;

    /// Short identifier used in logs (`"ip-api"`, `"google-geocoder"`).
    fn service_id(&self) -> &str;
}
