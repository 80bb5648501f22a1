//! Collaborator contract for the device location stack.
//!
//! The device side is a push source: it forwards raw events into the
//! dispatcher and receives aggregated [`DeviceSettings`] back whenever the set
//! of active requests changes.

use crate::error::LocationError;
use crate::models::{
    ActivityType, AuthorizationMode, AuthorizationStatus, Beacon, BeaconConstraint, Heading,
    Location, RegionCrossing, Visit,
};
use crate::types::Region;
use serde::{Deserialize, Serialize};

/// Raw events produced by the device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// New location fixes, oldest first
    Locations(Vec<Location>),
    /// New compass heading
    Heading(Heading),
    /// A monitored region boundary was crossed
    RegionCrossing(RegionCrossing),
    /// Beacons ranged in one pass
    Beacons(Vec<Beacon>),
    /// A visit was detected
    Visit(Visit),
    /// Authorization status changed
    AuthorizationChanged(AuthorizationStatus),
    /// The device reported a failure
    Error(LocationError),
}

/// What the location stack should currently be doing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Standard or significant-change location updates, if any are needed
    pub location: Option<LocationSettings>,
    /// Heading updates, if any are needed
    pub heading: Option<HeadingSettings>,
    /// Regions to monitor
    pub regions: Vec<Region>,
    /// Beacons to range
    pub beacons: Vec<BeaconConstraint>,
    /// Visit monitoring and its activity hint
    pub visits: Option<ActivityType>,
}

impl DeviceSettings {
    /// `true` when no service needs to run.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.location.is_none()
            && self.heading.is_none()
            && self.regions.is_empty()
            && self.beacons.is_empty()
            && self.visits.is_none()
    }
}

/// Aggregated location update parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSettings {
    /// Finest accuracy requested, in meters
    pub desired_accuracy: f64,
    /// Smallest distance filter requested, in meters
    pub distance_filter: f64,
    /// Only significant changes are needed
    pub significant_only: bool,
}

/// Aggregated heading update parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadingSettings {
    /// Finest heading accuracy requested, in degrees
    pub accuracy: Option<f64>,
}

/// Interface the engine uses to drive the device location stack.
///
/// Calls are made from the dispatcher's task and must not block.
pub trait DeviceLocationManager: Send + Sync {
    /// Current authorization status.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask the user for authorization. The outcome arrives later as
    /// [`DeviceEvent::AuthorizationChanged`].
    fn request_authorization(&self, mode: AuthorizationMode);

    /// Apply new settings.
    fn update_settings(&self, settings: &DeviceSettings);
}
