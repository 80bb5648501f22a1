//! Visit monitoring.

use super::{RequestKind, RequestOptions};
use crate::eviction::EvictionPolicy;
use crate::persist::PersistedOptions;
use crate::settings::DeviceDemand;
use locus_core::{ActivityType, DeviceEvent, Visit};
use serde::{Deserialize, Serialize};

/// Options for a visits monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitsOptions {
    /// Movement profile hint
    pub activity: ActivityType,
}

impl VisitsOptions {
    /// Monitor visits with the given activity hint.
    #[must_use]
    pub fn new(activity: ActivityType) -> Self {
        Self { activity }
    }
}

impl RequestOptions for VisitsOptions {
    type Output = Visit;

    fn kind(&self) -> RequestKind {
        RequestKind::Visits
    }

    fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::on_error()
    }

    fn candidates(&self, event: &DeviceEvent) -> Vec<Visit> {
        match event {
            DeviceEvent::Visit(visit) => vec![visit.clone()],
            _ => Vec::new(),
        }
    }

    fn device_demand(&self) -> Option<DeviceDemand> {
        Some(DeviceDemand::Visits(self.activity))
    }

    fn persisted(&self) -> Option<PersistedOptions> {
        Some(PersistedOptions::Visits(*self))
    }
}
