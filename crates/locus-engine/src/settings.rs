//! Aggregation of per-request device demands into [`DeviceSettings`].

use locus_core::{
    ActivityType, AuthorizationMode, BeaconConstraint, DeviceSettings, HeadingSettings,
    LocationSettings, Region,
};

/// Accuracy pushed to the device when every location request accepts any fix.
pub const FALLBACK_DESIRED_ACCURACY: f64 = 5000.0;

/// What one running request needs from the device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceDemand {
    /// Location updates
    Location {
        /// Accuracy threshold in meters, `None` for any
        accuracy: Option<f64>,
        /// Distance filter in meters
        distance_filter: f64,
        /// Significant-change updates are enough
        significant: bool,
    },
    /// Heading updates
    Heading {
        /// Accuracy threshold in degrees, `None` for any
        accuracy: Option<f64>,
    },
    /// Region monitoring
    Region(Region),
    /// Beacon ranging
    Beacons(BeaconConstraint),
    /// Visit monitoring
    Visits(ActivityType),
}

impl DeviceDemand {
    /// Authorization level the demand needs.
    #[must_use]
    pub fn authorization_mode(&self) -> AuthorizationMode {
        match self {
            Self::Location {
                significant: true, ..
            }
            | Self::Region(_)
            | Self::Visits(_) => AuthorizationMode::Always,
            _ => AuthorizationMode::WhenInUse,
        }
    }
}

/// Combine demands: finest accuracy, smallest distance filter, union of
/// regions and beacons.
#[must_use]
pub fn aggregate<'a>(demands: impl IntoIterator<Item = &'a DeviceDemand>) -> DeviceSettings {
    let mut settings = DeviceSettings::default();
    let mut location_accuracy: Option<f64> = None;

    for demand in demands {
        match demand {
            DeviceDemand::Location {
                accuracy,
                distance_filter,
                significant,
            } => {
                location_accuracy = min_option(location_accuracy, *accuracy);
                let merged = settings.location.get_or_insert(LocationSettings {
                    desired_accuracy: FALLBACK_DESIRED_ACCURACY,
                    distance_filter: *distance_filter,
                    significant_only: *significant,
                });
                merged.distance_filter = merged.distance_filter.min(*distance_filter);
                merged.significant_only &= *significant;
            }
            DeviceDemand::Heading { accuracy } => match settings.heading.as_mut() {
                Some(merged) => merged.accuracy = min_option(merged.accuracy, *accuracy),
                None => settings.heading = Some(HeadingSettings { accuracy: *accuracy }),
            },
            DeviceDemand::Region(region) => {
                if !settings.regions.iter().any(|r| r.id == region.id) {
                    settings.regions.push(region.clone());
                }
            }
            DeviceDemand::Beacons(constraint) => {
                if !settings.beacons.contains(constraint) {
                    settings.beacons.push(constraint.clone());
                }
            }
            DeviceDemand::Visits(activity) => {
                settings.visits.get_or_insert(*activity);
            }
        }
    }

    if let (Some(merged), Some(accuracy)) = (settings.location.as_mut(), location_accuracy) {
        merged.desired_accuracy = accuracy;
    }
    settings
}

fn min_option(current: Option<f64>, candidate: Option<f64>) -> Option<f64> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
