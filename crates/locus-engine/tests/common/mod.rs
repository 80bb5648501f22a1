//! Test doubles shared by the engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use locus_core::{
    AuthorizationMode, AuthorizationStatus, Coordinates, DeviceLocationManager, DeviceSettings,
    Heading, Location, NetworkService, RequestResult,
};
use locus_engine::{Locator, Request, RequestOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Device double recording what the dispatcher asks of it.
#[derive(Debug, Default)]
pub struct MockDevice {
    status: Mutex<AuthorizationStatus>,
    pushed: Mutex<Vec<DeviceSettings>>,
    authorizations: Mutex<Vec<AuthorizationMode>>,
}

impl MockDevice {
    pub fn with_status(status: AuthorizationStatus) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(status),
            ..Self::default()
        })
    }

    pub fn authorized() -> Arc<Self> {
        Self::with_status(AuthorizationStatus::AuthorizedWhenInUse)
    }

    pub fn pushed(&self) -> Vec<DeviceSettings> {
        self.pushed.lock().expect("lock").clone()
    }

    pub fn last_settings(&self) -> Option<DeviceSettings> {
        self.pushed.lock().expect("lock").last().cloned()
    }

    pub fn authorizations(&self) -> Vec<AuthorizationMode> {
        self.authorizations.lock().expect("lock").clone()
    }
}

impl DeviceLocationManager for MockDevice {
    fn authorization_status(&self) -> AuthorizationStatus {
        *self.status.lock().expect("lock")
    }

    fn request_authorization(&self, mode: AuthorizationMode) {
        self.authorizations.lock().expect("lock").push(mode);
    }

    fn update_settings(&self, settings: &DeviceSettings) {
        self.pushed.lock().expect("lock").push(settings.clone());
    }
}

/// Network double returning a canned result, optionally after a delay.
pub struct MockService<T> {
    result: RequestResult<T>,
    delay: Duration,
    calls: AtomicUsize,
}

impl<T> MockService<T> {
    pub fn new(result: RequestResult<T>) -> Arc<Self> {
        Self::delayed(result, Duration::ZERO)
    }

    pub fn delayed(result: RequestResult<T>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> NetworkService for MockService<T> {
    type Output = T;

    async fn execute(&self) -> RequestResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }

    fn service_id(&self) -> &str {
        "mock"
    }
}

/// Results delivered to a request's subscriber, in order.
pub type Recorded<T> = Arc<Mutex<Vec<RequestResult<T>>>>;

pub fn record<O: RequestOptions>(request: &Request<O>) -> Recorded<O::Output> {
    let recorded: Recorded<O::Output> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&recorded);
    request.subscribe(move |result| sink.lock().expect("lock").push(result.clone()));
    recorded
}

pub fn results<T: Clone>(recorded: &Recorded<T>) -> Vec<RequestResult<T>> {
    recorded.lock().expect("lock").clone()
}

/// Let spawned tasks run, then wait until the dispatcher drained its queue.
pub async fn settle(locator: &Locator) {
    tokio::time::sleep(Duration::from_millis(1)).await;
    locator.active_requests().await.expect("dispatcher running");
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn fix(latitude: f64, secs: i64) -> Location {
    Location::new(Coordinates::new(latitude, 9.19), 10.0, at(secs))
}

pub fn heading(accuracy: f64, secs: i64) -> Heading {
    Heading {
        magnetic_heading: 180.0,
        true_heading: 181.5,
        accuracy,
        timestamp: at(secs),
    }
}
