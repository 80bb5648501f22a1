//! Location fixes from the device.

use super::{RequestKind, RequestOptions};
use crate::eviction::EvictionPolicy;
use crate::persist::PersistedOptions;
use crate::settings::DeviceDemand;
use crate::timeout::TimeoutMode;
use locus_core::{DeviceEvent, DiscardReason, Location, RequestDefaults};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a location request stays subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subscription {
    /// One fix, then evicted
    Single,
    /// Every fix until cancelled
    Continuous,
    /// Significant changes only, until cancelled
    Significant,
}

/// Required horizontal accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationAccuracy {
    /// Any fix
    Any,
    /// 5 km
    City,
    /// 1 km
    Neighborhood,
    /// 100 m
    Block,
    /// 60 m
    House,
    /// 5 m
    Room,
    /// Explicit threshold in meters
    Custom(f64),
}

impl LocationAccuracy {
    /// Threshold in meters, `None` for [`LocationAccuracy::Any`].
    #[must_use]
    pub fn meters(self) -> Option<f64> {
        match self {
            Self::Any => None,
            Self::City => Some(5000.0),
            Self::Neighborhood => Some(1000.0),
            Self::Block => Some(100.0),
            Self::House => Some(60.0),
            Self::Room => Some(5.0),
            Self::Custom(meters) => Some(meters),
        }
    }
}

/// Options for a location request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationOptions {
    /// Subscription mode
    pub subscription: Subscription,
    /// Fixes coarser than this are discarded
    pub accuracy: LocationAccuracy,
    /// Fixes closer than this to the last accepted one are discarded, meters
    pub min_distance: f64,
    /// Fixes sooner than this after the last accepted one are discarded
    pub min_interval: Duration,
    /// Timeout configuration
    pub timeout: TimeoutMode,
}

impl LocationOptions {
    /// Options with block accuracy and no filters.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            accuracy: LocationAccuracy::Block,
            min_distance: 0.0,
            min_interval: Duration::ZERO,
            timeout: TimeoutMode::Never,
        }
    }

    /// Options using the configured accuracy.
    #[must_use]
    pub fn from_defaults(subscription: Subscription, defaults: &RequestDefaults) -> Self {
        Self::new(subscription).accuracy(LocationAccuracy::Custom(defaults.location_accuracy_meters))
    }

    /// One fix.
    #[must_use]
    pub fn single() -> Self {
        Self::new(Subscription::Single)
    }

    /// Every fix until cancelled.
    #[must_use]
    pub fn continuous() -> Self {
        Self::new(Subscription::Continuous)
    }

    /// Significant changes until cancelled.
    #[must_use]
    pub fn significant() -> Self {
        Self::new(Subscription::Significant)
    }

    /// Set the accuracy threshold.
    #[must_use]
    pub fn accuracy(mut self, accuracy: LocationAccuracy) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Set the minimum distance between accepted fixes.
    #[must_use]
    pub fn min_distance(mut self, meters: f64) -> Self {
        self.min_distance = meters;
        self
    }

    /// Set the minimum interval between accepted fixes.
    #[must_use]
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: TimeoutMode) -> Self {
        self.timeout = timeout;
        self
    }
}

impl RequestOptions for LocationOptions {
    type Output = Location;

    fn kind(&self) -> RequestKind {
        RequestKind::Location
    }

    fn eviction_policy(&self) -> EvictionPolicy {
        match self.subscription {
            Subscription::Single => EvictionPolicy::single_shot(),
            Subscription::Continuous | Subscription::Significant => EvictionPolicy::none(),
        }
    }

    fn timeout(&self) -> TimeoutMode {
        self.timeout
    }

    fn validate(&self, candidate: &Location, last: Option<&Location>) -> Option<DiscardReason> {
        if let Some(threshold) = self.accuracy.meters() {
            if candidate.horizontal_accuracy > threshold {
                return Some(DiscardReason::NotMinAccuracy);
            }
        }

        let last = last?;
        if self.min_distance > 0.0
            && candidate.coordinates.distance_to(&last.coordinates) < self.min_distance
        {
            return Some(DiscardReason::NotMinDistance);
        }
        if !self.min_interval.is_zero() {
            let elapsed = (candidate.timestamp - last.timestamp)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if elapsed < self.min_interval {
                return Some(DiscardReason::NotMinInterval);
            }
        }
        None
    }

    fn candidates(&self, event: &DeviceEvent) -> Vec<Location> {
        match event {
            DeviceEvent::Locations(locations) => locations.clone(),
            _ => Vec::new(),
        }
    }

    fn device_demand(&self) -> Option<DeviceDemand> {
        Some(DeviceDemand::Location {
            accuracy: self.accuracy.meters(),
            distance_filter: self.min_distance,
            significant: self.subscription == Subscription::Significant,
        })
    }

    fn persisted(&self) -> Option<PersistedOptions> {
        (self.subscription != Subscription::Single).then(|| PersistedOptions::Location(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use locus_core::Coordinates;

    fn fix(lat: f64, accuracy: f64, secs: i64) -> Location {
        let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        Location::new(Coordinates::new(lat, 9.0), accuracy, ts)
    }

    #[test]
    fn test_accuracy_presets() {
        assert_eq!(LocationAccuracy::Any.meters(), None);
        assert_eq!(LocationAccuracy::City.meters(), Some(5000.0));
        assert_eq!(LocationAccuracy::Room.meters(), Some(5.0));
        assert_eq!(LocationAccuracy::Custom(12.5).meters(), Some(12.5));
    }

    #[test]
    fn test_accuracy_filter() {
        let options = LocationOptions::continuous().accuracy(LocationAccuracy::House);
        assert_eq!(
            options.validate(&fix(45.0, 80.0, 0), None),
            Some(DiscardReason::NotMinAccuracy)
        );
        assert_eq!(options.validate(&fix(45.0, 60.0, 0), None), None);
    }

    #[test]
    fn test_distance_filter() {
        let options = LocationOptions::continuous().min_distance(500.0);
        let last = fix(45.0, 10.0, 0);
        // ~111 m north
        assert_eq!(
            options.validate(&fix(45.001, 10.0, 60), Some(&last)),
            Some(DiscardReason::NotMinDistance)
        );
        // ~1.1 km north
        assert_eq!(options.validate(&fix(45.01, 10.0, 60), Some(&last)), None);
    }

    #[test]
    fn test_interval_filter() {
        let options = LocationOptions::continuous().min_interval(Duration::from_secs(30));
        let last = fix(45.0, 10.0, 0);
        assert_eq!(
            options.validate(&fix(45.0, 10.0, 10), Some(&last)),
            Some(DiscardReason::NotMinInterval)
        );
        assert_eq!(options.validate(&fix(45.0, 10.0, 30), Some(&last)), None);
    }

    #[test]
    fn test_policy_by_subscription() {
        assert_eq!(
            LocationOptions::single().eviction_policy(),
            EvictionPolicy::single_shot()
        );
        assert!(LocationOptions::continuous().eviction_policy().is_empty());
        assert!(LocationOptions::single().persisted().is_none());
        assert!(LocationOptions::significant().persisted().is_some());
    }

    #[test]
    fn test_from_defaults() {
        let defaults = RequestDefaults::default();
        let options = LocationOptions::from_defaults(Subscription::Single, &defaults);
        assert_eq!(options.accuracy.meters(), Some(defaults.location_accuracy_meters));
    }
}
