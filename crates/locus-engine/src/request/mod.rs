//! Requests: the unit of work tracked by the dispatcher.
//!
//! A [`Request<O>`] is a cheap, cloneable handle. `O` is the kind's options
//! type and decides the payload type, the eviction policy, validation and how
//! device events are routed. The dispatcher never sees `O`; it drives every
//! kind through the object-safe [`QueuedRequest`] trait.

mod heading;
mod location;
mod lookup;
mod monitor;
mod visits;

pub use heading::HeadingOptions;
pub use location::{LocationAccuracy, LocationOptions, Subscription};
pub use lookup::Lookup;
pub use monitor::{BeaconOptions, RegionOptions};
pub use visits::VisitsOptions;

use crate::dispatcher::ServiceLink;
use crate::eviction::EvictionPolicy;
use crate::observers::{ObserverId, Observers};
use crate::persist::{PersistedOptions, RequestSnapshot};
use crate::settings::DeviceDemand;
use crate::timeout::TimeoutMode;
use locus_core::{
    AutocompleteMatch, DeviceEvent, DiscardReason, IpLocation, LocationError, Place, RequestId,
    RequestResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// A location request.
pub type LocationRequest = Request<LocationOptions>;
/// A heading request.
pub type HeadingRequest = Request<HeadingOptions>;
/// A region monitor.
pub type RegionRequest = Request<RegionOptions>;
/// A beacon monitor.
pub type BeaconRequest = Request<BeaconOptions>;
/// A visits monitor.
pub type VisitsRequest = Request<VisitsOptions>;
/// An IP geolocation lookup.
pub type IpLocationRequest = Request<Lookup<IpLocation>>;
/// A forward or reverse geocoding lookup.
pub type GeocodeRequest = Request<Lookup<Vec<Place>>>;
/// An autocomplete lookup.
pub type AutocompleteRequest = Request<Lookup<Vec<AutocompleteMatch>>>;

/// Subscriber callback for payload `T`.
pub type Callback<T> = Arc<dyn Fn(&RequestResult<T>) + Send + Sync>;

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Created, not queued yet
    Idle,
    /// Queued and receiving events
    Running,
    /// Queued, events are discarded
    Paused,
    /// Removed from the queue; terminal
    Expired,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Family a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Location fixes
    Location,
    /// Compass heading
    Heading,
    /// Region enter/exit
    Region,
    /// Beacon ranging
    Beacon,
    /// Visits
    Visits,
    /// IP geolocation
    IpLocation,
    /// Geocoding
    Geocode,
    /// Autocomplete
    Autocomplete,
}

impl RequestKind {
    /// `true` for kinds fed by the device location stack.
    #[must_use]
    pub fn is_device_backed(self) -> bool {
        matches!(
            self,
            Self::Location | Self::Heading | Self::Region | Self::Beacon | Self::Visits
        )
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Location => "location",
            Self::Heading => "heading",
            Self::Region => "region",
            Self::Beacon => "beacon",
            Self::Visits => "visits",
            Self::IpLocation => "ip_location",
            Self::Geocode => "geocode",
            Self::Autocomplete => "autocomplete",
        };
        f.write_str(s)
    }
}

/// Outcome of offering a value to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The value does not concern the request
    Ignored,
    /// The value was dropped without counting or dispatching
    Discarded(DiscardReason),
    /// The value reached the subscribers
    Dispatched {
        /// A success was counted
        success: bool,
        /// The eviction policy matched
        evict: bool,
    },
}

impl Delivery {
    /// `true` if the eviction policy matched.
    #[must_use]
    pub fn should_evict(self) -> bool {
        matches!(self, Self::Dispatched { evict: true, .. })
    }
}

/// Kind-specific behavior of a request.
pub trait RequestOptions: Clone + Send + Sync + 'static {
    /// Success payload.
    type Output: Clone + Send + Sync + fmt::Debug + 'static;

    /// Family of the request.
    fn kind(&self) -> RequestKind;

    /// Rules deciding when the request leaves the queue.
    fn eviction_policy(&self) -> EvictionPolicy;

    /// Timeout configuration.
    fn timeout(&self) -> TimeoutMode {
        TimeoutMode::Never
    }

    /// Decide whether `candidate` must be dropped, given the last accepted value.
    fn validate(
        &self,
        _candidate: &Self::Output,
        _last_accepted: Option<&Self::Output>,
    ) -> Option<DiscardReason> {
        None
    }

    /// Values carried by a device event that concern this request, in order.
    fn candidates(&self, _event: &DeviceEvent) -> Vec<Self::Output> {
        Vec::new()
    }

    /// What the request needs from the device while running.
    fn device_demand(&self) -> Option<DeviceDemand> {
        None
    }

    /// Whether an explicit cancel delivers [`LocationError::Cancelled`].
    fn cancel_delivers_failure(&self) -> bool {
        !self.kind().is_device_backed()
    }

    /// Kick off the kind's work once queued.
    fn start(&self, _request: &Request<Self>, _link: &ServiceLink) {}

    /// Serializable configuration, for kinds that survive restarts.
    fn persisted(&self) -> Option<PersistedOptions> {
        None
    }
}

struct RequestCore<T> {
    state: RequestState,
    observers: Observers<Callback<T>>,
    last_received: Option<RequestResult<T>>,
    last_accepted: Option<T>,
    count: u64,
    enabled: bool,
    name: Option<String>,
}

struct Inner<O: RequestOptions> {
    id: RequestId,
    options: O,
    policy: EvictionPolicy,
    token: CancellationToken,
    core: Mutex<RequestCore<O::Output>>,
}

/// Handle to a request of kind `O`.
///
/// Clones share state. Identity, equality and hashing go through [`RequestId`].
pub struct Request<O: RequestOptions> {
    inner: Arc<Inner<O>>,
}

impl<O: RequestOptions> Clone for Request<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: RequestOptions> PartialEq for Request<O> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<O: RequestOptions> Eq for Request<O> {}

impl<O: RequestOptions> std::hash::Hash for Request<O> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<O: RequestOptions> fmt::Debug for Request<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.options.kind())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<O: RequestOptions> Request<O> {
    /// Create an idle request with a fresh identifier.
    #[must_use]
    pub fn new(options: O) -> Self {
        Self::with_id(RequestId::generate(), options)
    }

    /// Create an idle request with a known identifier, used when restoring.
    #[must_use]
    pub fn with_id(id: RequestId, options: O) -> Self {
        let policy = options.eviction_policy();
        Self {
            inner: Arc::new(Inner {
                id,
                options,
                policy,
                token: CancellationToken::new(),
                core: Mutex::new(RequestCore {
                    state: RequestState::Idle,
                    observers: Observers::new(),
                    last_received: None,
                    last_accepted: None,
                    count: 0,
                    enabled: true,
                    name: None,
                }),
            }),
        }
    }

    fn core(&self) -> MutexGuard<'_, RequestCore<O::Output>> {
        self.inner.core.lock().expect("request lock poisoned")
    }

    /// Identifier.
    #[must_use]
    pub fn id(&self) -> &RequestId {
        &self.inner.id
    }

    /// Family of the request.
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        self.inner.options.kind()
    }

    /// Kind-specific options.
    #[must_use]
    pub fn options(&self) -> &O {
        &self.inner.options
    }

    /// Eviction rules, fixed at creation.
    #[must_use]
    pub fn eviction_policy(&self) -> &EvictionPolicy {
        &self.inner.policy
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.core().state
    }

    /// Number of accepted successes so far.
    #[must_use]
    pub fn count_received(&self) -> u64 {
        self.core().count
    }

    /// Last dispatched result.
    #[must_use]
    pub fn last_received(&self) -> Option<RequestResult<O::Output>> {
        self.core().last_received.clone()
    }

    /// Whether incoming values are considered.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.core().enabled
    }

    /// Gate incoming values without leaving the queue.
    pub fn set_enabled(&self, enabled: bool) {
        self.core().enabled = enabled;
    }

    /// Optional caller-chosen name.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.core().name.clone()
    }

    /// Set the caller-chosen name.
    pub fn set_name(&self, name: impl Into<String>) {
        self.core().name = Some(name.into());
    }

    /// Register a callback.
    ///
    /// If a result was already dispatched, the callback receives it
    /// immediately.
    pub fn subscribe<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&RequestResult<O::Output>) + Send + Sync + 'static,
    {
        let callback: Callback<O::Output> = Arc::new(callback);
        let (id, last) = {
            let mut core = self.core();
            (core.observers.add(Arc::clone(&callback)), core.last_received.clone())
        };
        if let Some(last) = last {
            callback(&last);
        }
        id
    }

    /// Unregister a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.core().observers.remove(id).is_some()
    }

    /// Unregister every callback.
    pub fn unsubscribe_all(&self) {
        self.core().observers.remove_all();
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.core().observers.len()
    }

    /// Token cancelled when the request leaves the queue.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Validate a candidate success and dispatch it if accepted.
    pub(crate) fn offer(&self, candidate: O::Output) -> Delivery {
        {
            let core = self.core();
            if core.state == RequestState::Expired {
                return Delivery::Ignored;
            }
            if !core.enabled {
                return Delivery::Discarded(DiscardReason::RequestNotEnabled);
            }
            if core.state == RequestState::Paused {
                return Delivery::Discarded(DiscardReason::RequestPaused);
            }
            if let Some(reason) = self
                .inner
                .options
                .validate(&candidate, core.last_accepted.as_ref())
            {
                return Delivery::Discarded(reason);
            }
        }
        self.receive(Ok(candidate))
    }

    /// Record a result, fan it out and evaluate the eviction policy.
    ///
    /// Nothing is dispatched once the request has expired.
    pub(crate) fn receive(&self, result: RequestResult<O::Output>) -> Delivery {
        let success = result.is_ok();
        let (callbacks, evict) = {
            let mut core = self.core();
            if core.state == RequestState::Expired {
                return Delivery::Ignored;
            }
            if let Ok(value) = &result {
                core.count += 1;
                core.last_accepted = Some(value.clone());
            }
            core.last_received = Some(result.clone());
            let evict = self.inner.policy.should_evict(&result, core.count);
            (core.observers.list(), evict)
        };

        for callback in &callbacks {
            callback(&result);
        }
        Delivery::Dispatched { success, evict }
    }

    /// Dispatch a final failure after removal, bypassing the policy.
    fn deliver_terminal(&self, error: LocationError) {
        let result: RequestResult<O::Output> = Err(error);
        let callbacks = {
            let mut core = self.core();
            core.last_received = Some(result.clone());
            core.observers.list()
        };
        for callback in &callbacks {
            callback(&result);
        }
    }

    fn transition(&self, from: RequestState, to: RequestState) -> bool {
        let mut core = self.core();
        if core.state == from {
            core.state = to;
            true
        } else {
            false
        }
    }
}

/// Snapshot of a queued request for introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    /// Identifier
    pub id: RequestId,
    /// Family
    pub kind: RequestKind,
    /// Lifecycle state
    pub state: RequestState,
    /// Accepted successes so far
    pub count_received: u64,
    /// Registered callbacks
    pub observers: usize,
    /// Caller-chosen name
    pub name: Option<String>,
}

/// Capability set the dispatcher drives every request kind through.
///
/// Implemented for every [`Request<O>`].
pub trait QueuedRequest: Send + Sync {
    /// Identifier.
    fn id(&self) -> &RequestId;

    /// Family.
    fn kind(&self) -> RequestKind;

    /// Lifecycle state.
    fn state(&self) -> RequestState;

    /// Timeout configuration.
    fn timeout(&self) -> TimeoutMode;

    /// Called once when the dispatcher accepts the request.
    fn did_add_in_queue(&self, link: &ServiceLink);

    /// Called once when the dispatcher drops the request.
    fn did_removed_from_queue(&self);

    /// Route a device event.
    fn on_device_event(&self, event: &DeviceEvent) -> Delivery;

    /// Dispatch a failure through the normal path.
    fn receive_failure(&self, error: LocationError) -> Delivery;

    /// Dispatch [`LocationError::Cancelled`] after removal, if the kind does so.
    fn deliver_cancelled(&self);

    /// Move running to paused.
    fn pause(&self) -> bool;

    /// Move paused to running.
    fn resume(&self) -> bool;

    /// `true` once removed from the queue.
    fn is_cancelled(&self) -> bool;

    /// What the request needs from the device while running.
    fn device_demand(&self) -> Option<DeviceDemand>;

    /// Introspection snapshot.
    fn summary(&self) -> RequestSummary;

    /// Persistable snapshot, for kinds that survive restarts.
    fn snapshot(&self) -> Option<RequestSnapshot>;
}

impl<O: RequestOptions> QueuedRequest for Request<O> {
    fn id(&self) -> &RequestId {
        &self.inner.id
    }

    fn kind(&self) -> RequestKind {
        self.inner.options.kind()
    }

    fn state(&self) -> RequestState {
        Request::state(self)
    }

    fn timeout(&self) -> TimeoutMode {
        self.inner.options.timeout()
    }

    fn did_add_in_queue(&self, link: &ServiceLink) {
        if self.transition(RequestState::Idle, RequestState::Running) {
            self.inner.options.start(self, link);
        }
    }

    fn did_removed_from_queue(&self) {
        self.inner.token.cancel();
        self.core().state = RequestState::Expired;
    }

    fn on_device_event(&self, event: &DeviceEvent) -> Delivery {
        if let DeviceEvent::Error(error) = event {
            if !self.kind().is_device_backed() {
                return Delivery::Ignored;
            }
            {
                let core = self.core();
                if !core.enabled {
                    return Delivery::Discarded(DiscardReason::RequestNotEnabled);
                }
                if core.state == RequestState::Paused {
                    return Delivery::Discarded(DiscardReason::RequestPaused);
                }
            }
            return self.receive(Err(error.clone()));
        }

        let mut outcome = Delivery::Ignored;
        for candidate in self.inner.options.candidates(event) {
            match self.offer(candidate) {
                Delivery::Ignored => {}
                Delivery::Discarded(reason) => {
                    if !matches!(outcome, Delivery::Dispatched { .. }) {
                        outcome = Delivery::Discarded(reason);
                    }
                }
                Delivery::Dispatched { success, evict } => {
                    let success = success
                        || matches!(outcome, Delivery::Dispatched { success: true, .. });
                    outcome = Delivery::Dispatched { success, evict };
                    if evict {
                        break;
                    }
                }
            }
        }
        outcome
    }

    fn receive_failure(&self, error: LocationError) -> Delivery {
        self.receive(Err(error))
    }

    fn deliver_cancelled(&self) {
        if self.inner.options.cancel_delivers_failure() {
            self.deliver_terminal(LocationError::Cancelled);
        }
    }

    fn pause(&self) -> bool {
        self.transition(RequestState::Running, RequestState::Paused)
    }

    fn resume(&self) -> bool {
        self.transition(RequestState::Paused, RequestState::Running)
    }

    fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    fn device_demand(&self) -> Option<DeviceDemand> {
        let core = self.core();
        if core.state == RequestState::Running && core.enabled {
            drop(core);
            self.inner.options.device_demand()
        } else {
            None
        }
    }

    fn summary(&self) -> RequestSummary {
        let core = self.core();
        RequestSummary {
            id: self.inner.id.clone(),
            kind: self.inner.options.kind(),
            state: core.state,
            count_received: core.count,
            observers: core.observers.len(),
            name: core.name.clone(),
        }
    }

    fn snapshot(&self) -> Option<RequestSnapshot> {
        let options = self.inner.options.persisted()?;
        Some(RequestSnapshot {
            id: self.inner.id.clone(),
            name: self.name(),
            options,
        })
    }
}
