//! The request queue.
//!
//! A single tokio task owns every active request. Callers, device events,
//! network completions and timers all reach it as [`Command`]s on one
//! unbounded channel, so queue mutations and subscriber dispatch are
//! serialized without locks around the queue itself.
//!
//! ```text
//!  Locator ──┐
//!  device  ──┼──► Command channel ──► Dispatcher ──► Request ──► subscribers
//!  network ──┤                           │
//!  timers  ──┘                           └──► DeviceLocationManager
//! ```

use crate::error::{DispatcherError, Result};
use crate::persist::RequestSnapshot;
use crate::request::{Delivery, QueuedRequest, RequestState, RequestSummary};
use crate::settings::{aggregate, DeviceDemand};
use crate::timeout::{TimeoutManager, TimerArm, TimerUpdate};
use chrono::Utc;
use locus_core::{
    AuthorizationMode, AuthorizationStatus, DeviceEvent, DeviceLocationManager, DeviceSettings,
    LocationError, RequestId,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Deferred delivery executed on the dispatcher task.
pub(crate) type Settlement = Box<dyn FnOnce() -> Delivery + Send>;

/// Messages processed by the dispatcher task.
pub(crate) enum Command {
    Add {
        request: Box<dyn QueuedRequest>,
        ack: oneshot::Sender<Result<()>>,
    },
    Cancel {
        id: RequestId,
        ack: oneshot::Sender<bool>,
    },
    Pause {
        id: RequestId,
        ack: oneshot::Sender<bool>,
    },
    Resume {
        id: RequestId,
        ack: oneshot::Sender<bool>,
    },
    Device(DeviceEvent),
    Settle {
        id: RequestId,
        apply: Settlement,
    },
    TimeoutFired {
        id: RequestId,
        generation: u64,
    },
    Summaries {
        ack: oneshot::Sender<Vec<RequestSummary>>,
    },
    Snapshots {
        ack: oneshot::Sender<Vec<RequestSnapshot>>,
    },
    Shutdown {
        ack: Option<oneshot::Sender<()>>,
    },
}

/// Channel back into the dispatcher for work that completes elsewhere.
///
/// Network completions must go through [`ServiceLink::settle`] instead of
/// touching the request directly.
#[derive(Clone)]
pub struct ServiceLink {
    commands: mpsc::UnboundedSender<Command>,
}

impl ServiceLink {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { commands }
    }

    /// Run `apply` on the dispatcher task.
    ///
    /// `apply` is dropped without running if request `id` has left the queue
    /// by then.
    pub fn settle<F>(&self, id: RequestId, apply: F)
    where
        F: FnOnce() -> Delivery + Send + 'static,
    {
        let command = Command::Settle {
            id,
            apply: Box::new(apply),
        };
        if self.commands.send(command).is_err() {
            debug!("Dispatcher stopped, dropping completion");
        }
    }
}

impl fmt::Debug for ServiceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLink")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

/// Why a request left the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Cancelled,
    Evicted,
    TimedOut,
    Shutdown,
}

impl Removal {
    fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Evicted => "evicted",
            Self::TimedOut => "timed_out",
            Self::Shutdown => "shutdown",
        }
    }

    fn delivers_cancellation(self) -> bool {
        matches!(self, Self::Cancelled | Self::Shutdown)
    }
}

struct Entry {
    request: Box<dyn QueuedRequest>,
    timer: TimeoutManager,
    timer_task: Option<JoinHandle<()>>,
}

impl Entry {
    fn schedule(&mut self, arm: TimerArm, link: &ServiceLink) {
        let id = self.request.id().clone();
        let commands = link.commands.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(arm.deadline).await;
            let _ = commands.send(Command::TimeoutFired {
                id,
                generation: arm.generation,
            });
        });
        if let Some(previous) = self.timer_task.replace(task) {
            previous.abort();
        }
    }

    fn stop_timer(&mut self) {
        self.timer.cancel();
        if let Some(task) = self.timer_task.take() {
            task.abort();
        }
    }

    /// Update the timer after a delivery. Returns `true` if the request must
    /// be evicted.
    fn note_delivery(&mut self, delivery: Delivery, link: &ServiceLink) -> bool {
        match delivery {
            Delivery::Ignored => false,
            Delivery::Discarded(reason) => {
                debug!(request_id = %self.request.id(), %reason, "Value discarded");
                false
            }
            Delivery::Dispatched { success, evict } => {
                if success && !evict {
                    match self.timer.on_data(Instant::now()) {
                        TimerUpdate::Rearmed(arm) => self.schedule(arm, link),
                        TimerUpdate::Disarmed => {
                            if let Some(task) = self.timer_task.take() {
                                task.abort();
                            }
                        }
                        TimerUpdate::Unchanged => {}
                    }
                }
                evict
            }
        }
    }
}

/// Owner of the active request set.
pub(crate) struct Dispatcher {
    device: Arc<dyn DeviceLocationManager>,
    link: ServiceLink,
    requests: HashMap<RequestId, Entry>,
    order: Vec<RequestId>,
    authorization: AuthorizationStatus,
    authorization_requested: bool,
    settings: DeviceSettings,
}

impl Dispatcher {
    /// Spawn the dispatcher on the current runtime.
    pub(crate) fn spawn(
        device: Arc<dyn DeviceLocationManager>,
    ) -> (mpsc::UnboundedSender<Command>, JoinHandle<()>) {
        let (commands, receiver) = mpsc::unbounded_channel();
        let dispatcher = Self {
            authorization: device.authorization_status(),
            device,
            link: ServiceLink::new(commands.clone()),
            requests: HashMap::new(),
            order: Vec::new(),
            authorization_requested: false,
            settings: DeviceSettings::default(),
        };
        let task = tokio::spawn(dispatcher.run(receiver));
        (commands, task)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!(authorization = %self.authorization, "Dispatcher started");
        while let Some(command) = commands.recv().await {
            if !self.handle(command) {
                break;
            }
        }
        info!("Dispatcher stopped");
    }

    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Add { request, ack } => {
                let _ = ack.send(self.add(request));
            }
            Command::Cancel { id, ack } => {
                let _ = ack.send(self.remove(&id, Removal::Cancelled));
            }
            Command::Pause { id, ack } => {
                let _ = ack.send(self.pause(&id));
            }
            Command::Resume { id, ack } => {
                let _ = ack.send(self.resume(&id));
            }
            Command::Device(event) => self.on_device_event(&event),
            Command::Settle { id, apply } => self.settle(&id, apply),
            Command::TimeoutFired { id, generation } => self.on_timeout(&id, generation),
            Command::Summaries { ack } => {
                let summaries = self
                    .order
                    .iter()
                    .filter_map(|id| self.requests.get(id))
                    .map(|entry| entry.request.summary())
                    .collect();
                let _ = ack.send(summaries);
            }
            Command::Snapshots { ack } => {
                let snapshots = self
                    .order
                    .iter()
                    .filter_map(|id| self.requests.get(id))
                    .filter_map(|entry| entry.request.snapshot())
                    .collect();
                let _ = ack.send(snapshots);
            }
            Command::Shutdown { ack } => {
                self.shutdown();
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
                return false;
            }
        }
        true
    }

    fn add(&mut self, request: Box<dyn QueuedRequest>) -> Result<()> {
        let id = request.id().clone();
        if self.requests.contains_key(&id) {
            warn!(request_id = %id, "Request already queued");
            return Err(DispatcherError::AlreadyQueued(id));
        }
        if request.state() == RequestState::Expired {
            warn!(request_id = %id, "Request already expired");
            return Err(DispatcherError::Expired(id));
        }

        let kind = request.kind();
        let entry = Entry {
            timer: TimeoutManager::new(request.timeout()),
            request,
            timer_task: None,
        };
        self.requests.insert(id.clone(), entry);
        self.order.push(id.clone());

        self.start_timeout_if_needed(&id);
        if let Some(entry) = self.requests.get(&id) {
            entry.request.did_add_in_queue(&self.link);
        }
        info!(request_id = %id, %kind, queued = self.order.len(), "Request added");

        if kind.is_device_backed() {
            if let Some(error) = self.authorization_failure() {
                self.fail_unauthorized(&id, error);
            }
            self.refresh_settings();
        }
        Ok(())
    }

    /// Failure delivered to device-backed requests while access is refused.
    fn authorization_failure(&self) -> Option<LocationError> {
        matches!(
            self.authorization,
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted
        )
        .then(|| LocationError::Generic(format!("location authorization {}", self.authorization)))
    }

    /// Deliver `error` to a freshly queued request, evicting it if its policy says so.
    fn fail_unauthorized(&mut self, id: &RequestId, error: LocationError) {
        let Some(entry) = self.requests.get_mut(id) else {
            return;
        };
        warn!(request_id = %id, authorization = %self.authorization, "Location access refused");
        let delivery = entry.request.on_device_event(&DeviceEvent::Error(error));
        if entry.note_delivery(delivery, &self.link) {
            self.remove(id, Removal::Evicted);
        }
    }

    /// Remove a request. Safe to call for unknown identifiers.
    fn remove(&mut self, id: &RequestId, reason: Removal) -> bool {
        let Some(mut entry) = self.requests.remove(id) else {
            return false;
        };
        self.order.retain(|queued| queued != id);

        entry.stop_timer();
        entry.request.did_removed_from_queue();
        if reason.delivers_cancellation() {
            entry.request.deliver_cancelled();
        }

        let kind = entry.request.kind();
        info!(request_id = %id, %kind, reason = reason.as_str(), "Request removed");
        if kind.is_device_backed() {
            self.refresh_settings();
        }
        true
    }

    fn pause(&mut self, id: &RequestId) -> bool {
        let paused = self
            .requests
            .get(id)
            .is_some_and(|entry| entry.request.kind().is_device_backed() && entry.request.pause());
        if paused {
            debug!(request_id = %id, "Request paused");
            self.refresh_settings();
        }
        paused
    }

    fn resume(&mut self, id: &RequestId) -> bool {
        let resumed = self
            .requests
            .get(id)
            .is_some_and(|entry| entry.request.resume());
        if resumed {
            debug!(request_id = %id, "Request resumed");
            self.refresh_settings();
        }
        resumed
    }

    fn start_timeout_if_needed(&mut self, id: &RequestId) {
        let authorized = self.authorization.is_authorized();
        let Some(entry) = self.requests.get_mut(id) else {
            return;
        };
        let gate_open = authorized || !entry.request.kind().is_device_backed();
        if let Some(arm) = entry.timer.arm(Instant::now(), Utc::now(), gate_open) {
            debug!(
                request_id = %id,
                timeout = ?entry.timer.mode(),
                "Timeout armed"
            );
            entry.schedule(arm, &self.link);
        }
    }

    fn on_device_event(&mut self, event: &DeviceEvent) {
        match event {
            DeviceEvent::AuthorizationChanged(status) => {
                self.on_authorization_changed(*status);
                return;
            }
            DeviceEvent::Error(error) => warn!(%error, "Device reported an error"),
            _ => {}
        }
        self.fan_out(event);
    }

    /// Route an event to every queued request, then drop the evicted ones.
    fn fan_out(&mut self, event: &DeviceEvent) {
        let mut evicted = Vec::new();
        for id in self.order.clone() {
            let Some(entry) = self.requests.get_mut(&id) else {
                continue;
            };
            let delivery = entry.request.on_device_event(event);
            if entry.note_delivery(delivery, &self.link) {
                evicted.push(id);
            }
        }
        for id in evicted {
            self.remove(&id, Removal::Evicted);
        }
    }

    fn on_authorization_changed(&mut self, status: AuthorizationStatus) {
        info!(%status, "Location authorization changed");
        self.authorization = status;

        if status.is_authorized() {
            for id in self.order.clone() {
                self.start_timeout_if_needed(&id);
            }
        } else if let Some(error) = self.authorization_failure() {
            self.fan_out(&DeviceEvent::Error(error));
        }
    }

    fn settle(&mut self, id: &RequestId, apply: Settlement) {
        let Some(entry) = self.requests.get_mut(id) else {
            debug!(request_id = %id, "Dropping completion for removed request");
            return;
        };
        if entry.request.is_cancelled() {
            debug!(request_id = %id, "Dropping completion for cancelled request");
            return;
        }
        let delivery = apply();
        if entry.note_delivery(delivery, &self.link) {
            self.remove(id, Removal::Evicted);
        }
    }

    fn on_timeout(&mut self, id: &RequestId, generation: u64) {
        let Some(entry) = self.requests.get_mut(id) else {
            return;
        };
        let Some(interval) = entry.timer.fire(generation) else {
            debug!(request_id = %id, generation, "Ignoring stale timer");
            return;
        };
        entry.timer_task = None;

        warn!(request_id = %id, ?interval, "Request timed out");
        entry.request.receive_failure(LocationError::timeout(interval));
        self.remove(id, Removal::TimedOut);
    }

    /// Recompute device settings and push them when they changed.
    fn refresh_settings(&mut self) {
        let demands: Vec<DeviceDemand> = self
            .order
            .iter()
            .filter_map(|id| self.requests.get(id))
            .filter_map(|entry| entry.request.device_demand())
            .collect();

        if !demands.is_empty() {
            self.request_authorization_if_needed(&demands);
        }

        let settings = aggregate(&demands);
        if settings != self.settings {
            debug!(?settings, "Pushing device settings");
            self.device.update_settings(&settings);
            self.settings = settings;
        }
    }

    fn request_authorization_if_needed(&mut self, demands: &[DeviceDemand]) {
        if self.authorization != AuthorizationStatus::NotDetermined || self.authorization_requested {
            return;
        }
        let mode = if demands
            .iter()
            .any(|demand| demand.authorization_mode() == AuthorizationMode::Always)
        {
            AuthorizationMode::Always
        } else {
            AuthorizationMode::WhenInUse
        };

        self.authorization_requested = true;
        info!(?mode, "Requesting location authorization");
        self.device.request_authorization(mode);
    }

    fn shutdown(&mut self) {
        info!(queued = self.order.len(), "Shutting down dispatcher");
        for id in self.order.clone() {
            self.remove(&id, Removal::Shutdown);
        }
    }
}
