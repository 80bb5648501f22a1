//! Locus Core - Foundation crate for the locus location toolkit.
//!
//! This crate provides shared types, the error taxonomy delivered to request
//! subscribers, configuration management, and the collaborator traits the
//! request engine consumes.
//!
//! # Modules
//!
//! - [`error`] - `LocationError`, `DiscardReason` and configuration errors
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - `RequestId`, coordinates and regions
//! - [`models`] - payloads produced by device and network collaborators
//! - [`device`] - device location stack contract and settings
//! - [`service`] - network lookup contract
//! - [`logging`] - tracing subscriber bootstrap
//!
//! # Example
//!
//! ```rust
//! use locus_core::{Coordinates, LocusConfig, Region};
//!
//! let config = LocusConfig::default();
//! assert!(config.validate().is_ok());
//!
//! let office = Region::new("office", Coordinates::new(45.46, 9.19), 150.0);
//! assert!(office.contains(&Coordinates::new(45.4601, 9.19)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::{CredentialsConfig, LocusConfig, RequestDefaults, ServicesConfig};
pub use device::{
    DeviceEvent, DeviceLocationManager, DeviceSettings, HeadingSettings, LocationSettings,
};
pub use error::{ConfigError, ConfigResult, DiscardReason, LocationError, RequestResult};
pub use models::{
    ActivityType, AuthorizationMode, AuthorizationStatus, AutocompleteMatch, Beacon,
    BeaconConstraint, CrossingKind, Heading, IpLocation, Location, PartialMatch, Place, Proximity,
    RegionCrossing, Visit,
};
pub use service::NetworkService;
pub use types::{Coordinates, Region, RequestId};
