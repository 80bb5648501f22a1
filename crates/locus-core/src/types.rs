//! Identifiers and geometry shared across locus crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for request identifiers.
///
/// Generated as UUID v4 at request creation and never reassigned; identity,
/// equality and hashing of requests all go through this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    /// Create a new random `RequestId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Parse a previously generated identifier.
    ///
    /// Any textual UUID form is accepted and stored hyphenated in lowercase.
    ///
    /// # Errors
    /// Returns the rejected input if it is not a UUID v4.
    pub fn parse(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        match uuid::Uuid::parse_str(&id) {
            Ok(uuid) if uuid.get_version_num() == 4 => Ok(Self(uuid.hyphenated().to_string())),
            _ => Err(id),
        }
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RequestId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value).map_err(|id| format!("invalid request ID: '{id}'"))
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mean Earth radius used for great-circle distances, in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl Coordinates {
    /// Create a coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in meters (haversine).
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlng = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }

    /// `"lat,lng"` as used by most HTTP geocoding APIs.
    #[must_use]
    pub fn comma_lat_lng(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A circular geographic region monitored for enter/exit crossings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Caller-chosen identifier, unique among monitored regions
    pub id: String,
    /// Center of the region
    pub center: Coordinates,
    /// Radius in meters
    pub radius: f64,
}

impl Region {
    /// Create a circular region.
    #[must_use]
    pub fn new(id: impl Into<String>, center: Coordinates, radius: f64) -> Self {
        Self {
            id: id.into(),
            center,
            radius,
        }
    }

    /// `true` if `point` lies inside the region.
    #[must_use]
    pub fn contains(&self, point: &Coordinates) -> bool {
        self.center.distance_to(point) <= self.radius
    }
}
