//! Entry point for applications.

use crate::dispatcher::{Command, Dispatcher};
use crate::error::{DispatcherError, Result};
use crate::persist::{RequestSnapshot, RestoredRequest};
use crate::request::{
    AutocompleteRequest, BeaconOptions, BeaconRequest, GeocodeRequest, HeadingOptions,
    HeadingRequest, IpLocationRequest, LocationOptions, LocationRequest, Lookup, RegionOptions,
    RegionRequest, Request, RequestKind, RequestOptions, RequestSummary, VisitsOptions,
    VisitsRequest,
};
use crate::timeout::TimeoutMode;
use locus_core::{
    AutocompleteMatch, BeaconConstraint, DeviceEvent, DeviceLocationManager, IpLocation,
    LocusConfig, NetworkService, Place, RequestId,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Explicitly constructed request context.
///
/// Owns one dispatcher task. Independent instances do not share state, so
/// tests can run several side by side.
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use locus_core::{DeviceLocationManager, LocusConfig};
/// # use locus_engine::{LocationOptions, Locator};
/// # async fn run(device: Arc<dyn DeviceLocationManager>) -> locus_engine::Result<()> {
/// let locator = Locator::new(LocusConfig::default(), device);
///
/// let request = locator.locate(LocationOptions::single()).await?;
/// request.subscribe(|result| match result {
///     Ok(location) => println!("at {}", location.coordinates),
///     Err(error) => eprintln!("failed: {error}"),
/// });
///
/// locator.shutdown().await
/// # }
/// ```
pub struct Locator {
    config: LocusConfig,
    commands: mpsc::UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Locator {
    /// Start a dispatcher on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(config: LocusConfig, device: Arc<dyn DeviceLocationManager>) -> Self {
        let (commands, task) = Dispatcher::spawn(device);
        Self {
            config,
            commands,
            task: Mutex::new(Some(task)),
        }
    }

    /// Configuration the locator was created with.
    #[must_use]
    pub fn config(&self) -> &LocusConfig {
        &self.config
    }

    /// Queue a request built by the caller.
    ///
    /// Subscribing before queueing guarantees no result is missed; late
    /// subscribers still receive the last result.
    pub async fn add<O: RequestOptions>(&self, request: Request<O>) -> Result<Request<O>> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Add {
            request: Box::new(request.clone()),
            ack,
        })?;
        done.await.map_err(|_| DispatcherError::Closed)??;
        Ok(request)
    }

    /// Request location fixes.
    pub async fn locate(&self, options: LocationOptions) -> Result<LocationRequest> {
        self.add(Request::new(options)).await
    }

    /// Request compass headings.
    pub async fn heading(&self, options: HeadingOptions) -> Result<HeadingRequest> {
        self.add(Request::new(options)).await
    }

    /// Monitor enter/exit crossings of a region.
    ///
    /// Pass a [`locus_core::Region`] to report both directions, or [`RegionOptions`]
    /// to choose.
    pub async fn monitor_region(
        &self,
        options: impl Into<RegionOptions>,
    ) -> Result<RegionRequest> {
        self.add(Request::new(options.into())).await
    }

    /// Range beacons matching `constraint`.
    pub async fn monitor_beacons(&self, constraint: BeaconConstraint) -> Result<BeaconRequest> {
        self.add(Request::new(BeaconOptions::new(constraint))).await
    }

    /// Monitor visits.
    pub async fn monitor_visits(&self, options: VisitsOptions) -> Result<VisitsRequest> {
        self.add(Request::new(options)).await
    }

    /// Look up the device's IP geolocation.
    pub async fn ip_location(
        &self,
        service: Arc<dyn NetworkService<Output = IpLocation>>,
    ) -> Result<IpLocationRequest> {
        self.lookup(RequestKind::IpLocation, service).await
    }

    /// Geocode an address or coordinates.
    pub async fn geocode(
        &self,
        service: Arc<dyn NetworkService<Output = Vec<Place>>>,
    ) -> Result<GeocodeRequest> {
        self.lookup(RequestKind::Geocode, service).await
    }

    /// Autocomplete a partial query or resolve a place.
    pub async fn autocomplete(
        &self,
        service: Arc<dyn NetworkService<Output = Vec<AutocompleteMatch>>>,
    ) -> Result<AutocompleteRequest> {
        self.lookup(RequestKind::Autocomplete, service).await
    }

    async fn lookup<T>(
        &self,
        kind: RequestKind,
        service: Arc<dyn NetworkService<Output = T>>,
    ) -> Result<Request<Lookup<T>>>
    where
        T: Clone + Send + Sync + std::fmt::Debug + 'static,
    {
        let lookup = Lookup::new(kind, service).with_timeout(self.network_timeout());
        self.add(Request::new(lookup)).await
    }

    /// Timeout applied to network lookups created by this locator.
    #[must_use]
    pub fn network_timeout(&self) -> TimeoutMode {
        match self.config.requests.network_timeout_secs {
            0 => TimeoutMode::Never,
            secs => TimeoutMode::Delayed(Duration::from_secs(secs)),
        }
    }

    /// Recreate and queue a persisted request.
    pub async fn restore(&self, snapshot: &RequestSnapshot) -> Result<RestoredRequest> {
        let restored = snapshot.restore();
        let (ack, done) = oneshot::channel();
        self.send(Command::Add {
            request: restored.boxed(),
            ack,
        })?;
        done.await.map_err(|_| DispatcherError::Closed)??;
        debug!(request_id = %restored.id(), "Request restored");
        Ok(restored)
    }

    /// Cancel a request. Returns `false` if it was not queued.
    pub async fn cancel(&self, id: &RequestId) -> Result<bool> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Cancel {
            id: id.clone(),
            ack,
        })?;
        done.await.map_err(|_| DispatcherError::Closed)
    }

    /// Pause a running device-backed request.
    pub async fn pause(&self, id: &RequestId) -> Result<bool> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Pause {
            id: id.clone(),
            ack,
        })?;
        done.await.map_err(|_| DispatcherError::Closed)
    }

    /// Resume a paused request.
    pub async fn resume(&self, id: &RequestId) -> Result<bool> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Resume {
            id: id.clone(),
            ack,
        })?;
        done.await.map_err(|_| DispatcherError::Closed)
    }

    /// Sink the device collaborator pushes its events into.
    #[must_use]
    pub fn device_events(&self) -> DeviceEventSink {
        DeviceEventSink {
            commands: self.commands.clone(),
        }
    }

    /// Summaries of queued requests in insertion order.
    pub async fn active_requests(&self) -> Result<Vec<RequestSummary>> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Summaries { ack })?;
        done.await.map_err(|_| DispatcherError::Closed)
    }

    /// Snapshots of queued requests that survive restarts.
    pub async fn snapshots(&self) -> Result<Vec<RequestSnapshot>> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Snapshots { ack })?;
        done.await.map_err(|_| DispatcherError::Closed)
    }

    /// Remove every request and stop the dispatcher.
    pub async fn shutdown(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Shutdown { ack: Some(ack) })?;
        done.await.map_err(|_| DispatcherError::Closed)?;

        let task = self.task.lock().expect("locator lock poisoned").take();
        if let Some(task) = task {
            let _ = task.await;
        }
        Ok(())
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| DispatcherError::Closed)
    }
}

impl Drop for Locator {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown { ack: None });
    }
}

/// Handle the device collaborator uses to push events.
#[derive(Clone)]
pub struct DeviceEventSink {
    commands: mpsc::UnboundedSender<Command>,
}

impl DeviceEventSink {
    /// Push an event. Fails once the dispatcher has stopped.
    pub fn send(&self, event: DeviceEvent) -> Result<()> {
        self.commands
            .send(Command::Device(event))
            .map_err(|_| DispatcherError::Closed)
    }
}

impl std::fmt::Debug for DeviceEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceEventSink")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}
