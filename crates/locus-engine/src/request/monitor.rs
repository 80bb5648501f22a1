//! Region and beacon monitors.

use super::{RequestKind, RequestOptions};
use crate::eviction::EvictionPolicy;
use crate::persist::PersistedOptions;
use crate::settings::DeviceDemand;
use locus_core::{Beacon, BeaconConstraint, CrossingKind, DeviceEvent, Region, RegionCrossing};
use serde::{Deserialize, Serialize};

/// Enter/exit monitoring for one circular region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionOptions {
    /// Monitored region
    pub region: Region,
    /// Report entering the region
    #[serde(default = "notify_default")]
    pub notify_on_entry: bool,
    /// Report leaving the region
    #[serde(default = "notify_default")]
    pub notify_on_exit: bool,
}

fn notify_default() -> bool {
    true
}

impl RegionOptions {
    /// Monitor `region`, reporting both directions.
    #[must_use]
    pub fn new(region: Region) -> Self {
        Self {
            region,
            notify_on_entry: true,
            notify_on_exit: true,
        }
    }

    /// Whether entering the region is reported.
    #[must_use]
    pub fn notify_on_entry(mut self, notify: bool) -> Self {
        self.notify_on_entry = notify;
        self
    }

    /// Whether leaving the region is reported.
    #[must_use]
    pub fn notify_on_exit(mut self, notify: bool) -> Self {
        self.notify_on_exit = notify;
        self
    }

    fn reports(&self, kind: CrossingKind) -> bool {
        match kind {
            CrossingKind::Enter => self.notify_on_entry,
            CrossingKind::Exit => self.notify_on_exit,
        }
    }
}

impl From<Region> for RegionOptions {
    fn from(region: Region) -> Self {
        Self::new(region)
    }
}

impl RequestOptions for RegionOptions {
    type Output = RegionCrossing;

    fn kind(&self) -> RequestKind {
        RequestKind::Region
    }

    fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::on_error()
    }

    fn candidates(&self, event: &DeviceEvent) -> Vec<RegionCrossing> {
        match event {
            DeviceEvent::RegionCrossing(crossing)
                if crossing.region_id == self.region.id && self.reports(crossing.kind) =>
            {
                vec![crossing.clone()]
            }
            _ => Vec::new(),
        }
    }

    fn device_demand(&self) -> Option<DeviceDemand> {
        Some(DeviceDemand::Region(self.region.clone()))
    }

    fn persisted(&self) -> Option<PersistedOptions> {
        Some(PersistedOptions::Region(self.clone()))
    }
}

/// Ranging of beacons matching a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconOptions {
    /// Beacons to report
    pub constraint: BeaconConstraint,
}

impl BeaconOptions {
    /// Range beacons matching `constraint`.
    #[must_use]
    pub fn new(constraint: BeaconConstraint) -> Self {
        Self { constraint }
    }
}

impl RequestOptions for BeaconOptions {
    type Output = Vec<Beacon>;

    fn kind(&self) -> RequestKind {
        RequestKind::Beacon
    }

    fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::on_error()
    }

    fn candidates(&self, event: &DeviceEvent) -> Vec<Vec<Beacon>> {
        let DeviceEvent::Beacons(beacons) = event else {
            return Vec::new();
        };
        let matching: Vec<Beacon> = beacons
            .iter()
            .filter(|beacon| self.constraint.matches(beacon))
            .cloned()
            .collect();
        if matching.is_empty() {
            Vec::new()
        } else {
            vec![matching]
        }
    }

    fn device_demand(&self) -> Option<DeviceDemand> {
        Some(DeviceDemand::Beacons(self.constraint.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_core::{Coordinates, Proximity};
    use uuid::Uuid;

    fn beacon(uuid: Uuid, major: u16) -> Beacon {
        Beacon {
            uuid,
            major,
            minor: 1,
            proximity: Proximity::Immediate,
            rssi: -40,
            accuracy: 0.3,
        }
    }

    #[test]
    fn test_region_matches_own_id() {
        let options = RegionOptions::new(Region::new("home", Coordinates::new(0.0, 0.0), 100.0));
        let mine = DeviceEvent::RegionCrossing(RegionCrossing {
            region_id: "home".to_string(),
            kind: CrossingKind::Enter,
        });
        let other = DeviceEvent::RegionCrossing(RegionCrossing {
            region_id: "work".to_string(),
            kind: CrossingKind::Exit,
        });

        assert_eq!(options.candidates(&mine).len(), 1);
        assert!(options.candidates(&other).is_empty());
        assert_eq!(options.eviction_policy(), EvictionPolicy::on_error());
    }

    #[test]
    fn test_region_entry_only() {
        let options = RegionOptions::new(Region::new("home", Coordinates::new(0.0, 0.0), 100.0))
            .notify_on_exit(false);
        let crossing = |kind| {
            DeviceEvent::RegionCrossing(RegionCrossing {
                region_id: "home".to_string(),
                kind,
            })
        };

        assert_eq!(options.candidates(&crossing(CrossingKind::Enter)).len(), 1);
        assert!(options.candidates(&crossing(CrossingKind::Exit)).is_empty());
    }

    #[test]
    fn test_region_notify_flags_default_when_missing() {
        let options: RegionOptions = serde_json::from_str(
            r#"{"region":{"id":"home","center":{"latitude":0.0,"longitude":0.0},"radius":100.0}}"#,
        )
        .expect("decode options");
        assert!(options.notify_on_entry);
        assert!(options.notify_on_exit);
    }

    #[test]
    fn test_beacons_filtered() {
        let uuid = Uuid::new_v4();
        let options = BeaconOptions::new(BeaconConstraint::new(uuid).with_major(3));
        let event = DeviceEvent::Beacons(vec![
            beacon(uuid, 3),
            beacon(uuid, 4),
            beacon(Uuid::nil(), 3),
        ]);

        let candidates = options.candidates(&event);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0], vec![beacon(uuid, 3)]);

        let none = DeviceEvent::Beacons(vec![beacon(Uuid::nil(), 3)]);
        assert!(options.candidates(&none).is_empty());
    }
}
