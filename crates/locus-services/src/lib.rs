//! Locus Services - network-backed lookups for locus.
//!
//! Each provider implements [`locus_core::NetworkService`] and can be handed
//! to a `locus_engine::Locator` as a one-shot lookup request.
//!
//! # Providers
//!
//! - **IP geolocation**: ip-api.com, ipapi.co and ipstack, selectable through
//!   [`IpProvider`]
//! - **Geocoding**: Google Geocoding API, forward and reverse
//! - **Autocomplete**: Google Places autocomplete and place details
//!
//! # Example
//!
//! ```rust,no_run
//! use locus_core::{LocusConfig, NetworkService};
//! use locus_services::{GeocodeQuery, GoogleGeocoderService, IpProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LocusConfig::load_with_env()?;
//!
//! let ip = IpProvider::preferred(&config).service(&config, None)?;
//! let here = ip.execute().await?;
//! println!("Connected from {:?}", here.city);
//!
//! let geocoder = GoogleGeocoderService::from_config(
//!     &config,
//!     GeocodeQuery::Address("1600 Amphitheatre Parkway".to_string()),
//! )?;
//! for place in geocoder.execute().await? {
//!     println!("{:?}", place.formatted_address);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Provider failures are reported as [`locus_core::LocationError`]:
//!
//! ```text
//! bad base URL         → InternalError
//! transport timeout    → Timeout
//! transport failure    → Generic
//! non-2xx status       → Other("<status code>")
//! undecodable body     → ParsingError
//! rejected credentials → MissingApiKey
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod providers;

// Re-export commonly used types
pub use providers::common::HttpClient;
pub use providers::{
    GeocodeQuery, GoogleGeocoderService, GooglePlacesService, IpApiCoService, IpApiService,
    IpProvider, IpstackService, PlacesQuery,
};
