//! Compass headings from the device.

use super::{RequestKind, RequestOptions};
use crate::eviction::EvictionPolicy;
use crate::settings::DeviceDemand;
use crate::timeout::TimeoutMode;
use locus_core::{DeviceEvent, DiscardReason, Heading, RequestDefaults};
use std::time::Duration;

/// Options for a heading request.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingOptions {
    /// Headings reporting an accuracy above this many degrees are discarded
    pub accuracy: Option<f64>,
    /// Headings sooner than this after the last accepted one are discarded
    pub min_interval: Duration,
    /// Evict on the first device error
    pub cancel_on_error: bool,
    /// Timeout configuration
    pub timeout: TimeoutMode,
}

impl Default for HeadingOptions {
    fn default() -> Self {
        Self {
            accuracy: None,
            min_interval: Duration::ZERO,
            cancel_on_error: false,
            timeout: TimeoutMode::Never,
        }
    }
}

impl HeadingOptions {
    /// Options with the given accuracy threshold in degrees.
    #[must_use]
    pub fn new(accuracy: f64) -> Self {
        Self {
            accuracy: Some(accuracy),
            ..Self::default()
        }
    }

    /// Options from configured defaults.
    #[must_use]
    pub fn from_defaults(defaults: &RequestDefaults) -> Self {
        Self::new(defaults.heading_accuracy_degrees)
            .min_interval(Duration::from_millis(defaults.heading_min_interval_ms))
    }

    /// Set the minimum interval between accepted headings.
    #[must_use]
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Evict on the first device error.
    #[must_use]
    pub fn cancel_on_error(mut self, cancel: bool) -> Self {
        self.cancel_on_error = cancel;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: TimeoutMode) -> Self {
        self.timeout = timeout;
        self
    }
}

impl RequestOptions for HeadingOptions {
    type Output = Heading;

    fn kind(&self) -> RequestKind {
        RequestKind::Heading
    }

    fn eviction_policy(&self) -> EvictionPolicy {
        if self.cancel_on_error {
            EvictionPolicy::on_error()
        } else {
            EvictionPolicy::none()
        }
    }

    fn timeout(&self) -> TimeoutMode {
        self.timeout
    }

    fn validate(&self, candidate: &Heading, last: Option<&Heading>) -> Option<DiscardReason> {
        // Smaller accuracy values are finer.
        if let Some(threshold) = self.accuracy {
            if candidate.accuracy > threshold {
                return Some(DiscardReason::NotMinAccuracy);
            }
        }

        if let Some(last) = last {
            let elapsed = (candidate.timestamp - last.timestamp)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if elapsed < self.min_interval {
                return Some(DiscardReason::NotMinInterval);
            }
        }
        None
    }

    fn candidates(&self, event: &DeviceEvent) -> Vec<Heading> {
        match event {
            DeviceEvent::Heading(heading) => vec![heading.clone()],
            _ => Vec::new(),
        }
    }

    fn device_demand(&self) -> Option<DeviceDemand> {
        Some(DeviceDemand::Heading {
            accuracy: self.accuracy,
        })
    }
}
