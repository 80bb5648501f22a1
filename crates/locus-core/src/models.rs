//! Payloads produced by device and network collaborators.

use crate::types::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A location fix reported by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Position of the fix
    pub coordinates: Coordinates,
    /// Radius of uncertainty in meters
    pub horizontal_accuracy: f64,
    /// Altitude in meters, if known
    pub altitude: Option<f64>,
    /// Speed in m/s, if known
    pub speed: Option<f64>,
    /// Course in degrees from true north, if known
    pub course: Option<f64>,
    /// When the fix was taken
    pub timestamp: DateTime<Utc>,
}

impl Location {
    /// Create a fix with only position, accuracy and time.
    #[must_use]
    pub fn new(coordinates: Coordinates, horizontal_accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinates,
            horizontal_accuracy,
            altitude: None,
            speed: None,
            course: None,
            timestamp,
        }
    }
}

/// A compass heading reported by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading relative to magnetic north, degrees
    pub magnetic_heading: f64,
    /// Heading relative to true north, degrees
    pub true_heading: f64,
    /// Maximum deviation in degrees; smaller is finer
    pub accuracy: f64,
    /// When the heading was measured
    pub timestamp: DateTime<Utc>,
}

/// Movement profile hint passed to the device for visit monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// Unspecified activity
    #[default]
    Other,
    /// Driving
    AutomotiveNavigation,
    /// Walking, running, cycling
    Fitness,
    /// Boats, trains and other non-automotive transport
    OtherNavigation,
    /// Flight
    Airborne,
}

/// A place the user dwelt at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    /// Center of the visit
    pub coordinates: Coordinates,
    /// Radius of uncertainty in meters
    pub horizontal_accuracy: f64,
    /// Arrival time, if known
    pub arrival: Option<DateTime<Utc>>,
    /// Departure time, if the visit has ended
    pub departure: Option<DateTime<Utc>>,
}

/// Direction of a region boundary crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingKind {
    /// The device entered the region
    Enter,
    /// The device left the region
    Exit,
}

/// A boundary crossing for a monitored region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCrossing {
    /// Identifier of the crossed region
    pub region_id: String,
    /// Enter or exit
    pub kind: CrossingKind,
}

/// Relative distance to a ranged beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proximity {
    /// Distance could not be determined
    Unknown,
    /// Very close
    Immediate,
    /// A few meters
    Near,
    /// Further away
    Far,
}

/// Which beacons a monitor is interested in.
///
/// `major`/`minor` narrow the match when set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BeaconConstraint {
    /// Proximity UUID
    pub uuid: Uuid,
    /// Major value, `None` matches any
    pub major: Option<u16>,
    /// Minor value, `None` matches any
    pub minor: Option<u16>,
}

impl BeaconConstraint {
    /// Constraint on the proximity UUID only.
    #[must_use]
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            major: None,
            minor: None,
        }
    }

    /// Narrow to a major value.
    #[must_use]
    pub fn with_major(mut self, major: u16) -> Self {
        self.major = Some(major);
        self
    }

    /// Narrow to a minor value.
    #[must_use]
    pub fn with_minor(mut self, minor: u16) -> Self {
        self.minor = Some(minor);
        self
    }

    /// `true` if `beacon` satisfies the constraint.
    #[must_use]
    pub fn matches(&self, beacon: &Beacon) -> bool {
        self.uuid == beacon.uuid
            && self.major.map_or(true, |m| m == beacon.major)
            && self.minor.map_or(true, |m| m == beacon.minor)
    }
}

/// A ranged beacon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    /// Proximity UUID
    pub uuid: Uuid,
    /// Major value
    pub major: u16,
    /// Minor value
    pub minor: u16,
    /// Relative distance
    pub proximity: Proximity,
    /// Received signal strength in dBm
    pub rssi: i32,
    /// Estimated distance in meters
    pub accuracy: f64,
}

/// Geolocation of an IP address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpLocation {
    /// Queried IP, when the provider reports it
    pub ip: Option<String>,
    /// Approximate position
    pub coordinates: Option<Coordinates>,
    /// City name
    pub city: Option<String>,
    /// Region/state name
    pub region_name: Option<String>,
    /// Region/state code
    pub region_code: Option<String>,
    /// Country name
    pub country_name: Option<String>,
    /// ISO country code
    pub country_code: Option<String>,
    /// Continent name
    pub continent: Option<String>,
    /// Postal code
    pub postal_code: Option<String>,
    /// IANA time zone
    pub timezone: Option<String>,
    /// Internet service provider
    pub isp: Option<String>,
    /// Organization owning the address
    pub organization: Option<String>,
    /// Reverse DNS hostname
    pub hostname: Option<String>,
}

/// A geocoded place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Provider's place identifier
    pub place_id: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Full formatted address
    pub formatted_address: Option<String>,
    /// Position of the place
    pub coordinates: Option<Coordinates>,
    /// Country name
    pub country: Option<String>,
    /// ISO country code
    pub country_code: Option<String>,
    /// First-level administrative area (state, region)
    pub administrative_area: Option<String>,
    /// Second-level administrative area (county, province)
    pub sub_administrative_area: Option<String>,
    /// City
    pub locality: Option<String>,
    /// Street or neighborhood
    pub thoroughfare: Option<String>,
    /// Postal code
    pub postal_code: Option<String>,
    /// Precision of the geocode as reported by the provider
    pub location_type: Option<String>,
}

/// A partial autocomplete prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialMatch {
    /// Identifier usable for a detail lookup
    pub place_id: String,
    /// Human readable suggestion
    pub description: String,
    /// Main text of the suggestion
    pub main_text: Option<String>,
    /// Secondary text of the suggestion
    pub secondary_text: Option<String>,
    /// Place types reported by the provider
    pub types: Vec<String>,
}

/// One autocomplete result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutocompleteMatch {
    /// A suggestion for a partial query
    Partial(PartialMatch),
    /// A fully resolved place
    Place(Place),
}

/// Device authorization for location services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// The user has not been asked yet
    #[default]
    NotDetermined,
    /// The user denied access
    Denied,
    /// Access is restricted by policy
    Restricted,
    /// Granted while the app is in use
    AuthorizedWhenInUse,
    /// Granted at all times
    AuthorizedAlways,
}

impl AuthorizationStatus {
    /// `true` if location events may flow.
    #[must_use]
    pub fn is_authorized(self) -> bool {
        matches!(self, Self::AuthorizedWhenInUse | Self::AuthorizedAlways)
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotDetermined => "not_determined",
            Self::Denied => "denied",
            Self::Restricted => "restricted",
            Self::AuthorizedWhenInUse => "when_in_use",
            Self::AuthorizedAlways => "always",
        };
        f.write_str(s)
    }
}

/// Which authorization to ask the user for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationMode {
    /// Foreground only
    WhenInUse,
    /// Foreground and background
    Always,
}
