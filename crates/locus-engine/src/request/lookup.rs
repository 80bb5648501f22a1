//! Single-shot network lookups.

use super::{Request, RequestKind, RequestOptions};
use crate::dispatcher::ServiceLink;
use crate::eviction::EvictionPolicy;
use crate::timeout::TimeoutMode;
use locus_core::NetworkService;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A lookup backed by a [`NetworkService`].
///
/// The eviction policy is always `{onError, onReceiveData(1)}`. Cancelling
/// delivers [`locus_core::LocationError::Cancelled`].
pub struct Lookup<T: Send + 'static> {
    kind: RequestKind,
    service: Arc<dyn NetworkService<Output = T>>,
    timeout: TimeoutMode,
}

impl<T: Send + 'static> Lookup<T> {
    /// Wrap `service` as a request of the given network kind.
    #[must_use]
    pub(crate) fn new(kind: RequestKind, service: Arc<dyn NetworkService<Output = T>>) -> Self {
        debug_assert!(
            !kind.is_device_backed(),
            "{kind} is not a network lookup kind"
        );
        Self {
            kind,
            service,
            timeout: TimeoutMode::Never,
        }
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: TimeoutMode) -> Self {
        self.timeout = timeout;
        self
    }

    /// Identifier of the underlying service.
    #[must_use]
    pub fn service_id(&self) -> &str {
        self.service.service_id()
    }
}

impl<T: Send + 'static> Clone for Lookup<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            service: Arc::clone(&self.service),
            timeout: self.timeout,
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Lookup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lookup")
            .field("kind", &self.kind)
            .field("service", &self.service.service_id())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<T> RequestOptions for Lookup<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    type Output = T;

    fn kind(&self) -> RequestKind {
        self.kind
    }

    fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::single_shot()
    }

    fn timeout(&self) -> TimeoutMode {
        self.timeout
    }

    fn cancel_delivers_failure(&self) -> bool {
        true
    }

    fn start(&self, request: &Request<Self>, link: &ServiceLink) {
        let service = Arc::clone(&self.service);
        let token = request.cancellation_token();
        let request = request.clone();
        let link = link.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = token.cancelled() => return,
                result = service.execute() => result,
            };
            debug!(
                request_id = %request.id(),
                service = service.service_id(),
                ok = result.is_ok(),
                "Network lookup completed"
            );
            let id = request.id().clone();
            link.settle(id, move || request.receive(result));
        });
    }
}
