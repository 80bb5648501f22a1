//! Locus Engine - request queue, eviction and timeout handling.
//!
//! Applications create requests through a [`Locator`], subscribe to their
//! results and let the engine decide when each request leaves the queue.
//!
//! # Architecture
//!
//! - [`Request<O>`] is a typed handle; `O` selects the kind (location,
//!   heading, region, beacon, visits, network lookups).
//! - One dispatcher task per [`Locator`] owns the active set. Device events
//!   and network completions are routed to it over a channel, validated by
//!   each request, fanned out to subscribers, and checked against the
//!   request's [`EvictionPolicy`].
//! - A [`TimeoutManager`] per request turns an elapsed deadline into a
//!   [`locus_core::LocationError::Timeout`] delivery followed by removal.
//!
//! # Example
//!
//! ```rust
//! use locus_engine::{EvictionPolicy, EvictionRule};
//!
//! let policy = EvictionPolicy::single_shot();
//! assert!(policy.contains(EvictionRule::OnError));
//! assert!(policy.should_evict(&Ok::<_, ()>(()), 1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod dispatcher;
pub mod error;
pub mod eviction;
mod locator;
pub mod observers;
pub mod persist;
pub mod request;
pub mod settings;
pub mod timeout;

pub use dispatcher::ServiceLink;
pub use error::{DispatcherError, PersistError, Result};
pub use eviction::{EvictionPolicy, EvictionRule};
pub use locator::{DeviceEventSink, Locator};
pub use observers::{ObserverId, Observers};
pub use persist::{PersistedOptions, RequestSnapshot, RequestStore, RestoredRequest};
pub use request::{
    AutocompleteRequest, BeaconOptions, BeaconRequest, Callback, Delivery, GeocodeRequest,
    HeadingOptions, HeadingRequest, IpLocationRequest, LocationAccuracy, LocationOptions,
    LocationRequest, Lookup, QueuedRequest, RegionOptions, RegionRequest, Request, RequestKind,
    RequestOptions, RequestState, RequestSummary, Subscription, VisitsOptions, VisitsRequest,
};
pub use settings::DeviceDemand;
pub use timeout::{TimeoutManager, TimeoutMode};
