//! Network provider implementations.

pub mod common;
pub(crate) mod google;
pub mod google_geocoder;
pub mod google_places;
pub mod ip_api;
pub mod ipapi_co;
pub mod ipstack;

pub use google_geocoder::{GeocodeQuery, GoogleGeocoderService};
pub use google_places::{GooglePlacesService, PlacesQuery};
pub use ip_api::IpApiService;
pub use ipapi_co::IpApiCoService;
pub use ipstack::IpstackService;

use locus_core::{IpLocation, LocusConfig, NetworkService, RequestResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// IP geolocation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpProvider {
    /// ip-api.com
    IpApi,
    /// ipapi.co
    IpApiCo,
    /// ipstack.com (requires a key)
    Ipstack,
}

impl IpProvider {
    /// Best available provider for `config`: ipstack when a key is set,
    /// ip-api.com otherwise.
    #[must_use]
    pub fn preferred(config: &LocusConfig) -> Self {
        let has_key = config
            .credentials
            .ipstack_api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty());
        if has_key {
            Self::Ipstack
        } else {
            Self::IpApi
        }
    }

    /// Build a lookup for `ip`, or for the caller's own address when `None`.
    ///
    /// # Errors
    /// Returns [`locus_core::LocationError::MissingApiKey`] for ipstack
    /// without a configured key.
    pub fn service(
        self,
        config: &LocusConfig,
        ip: Option<&str>,
    ) -> RequestResult<Arc<dyn NetworkService<Output = IpLocation>>> {
        let service: Arc<dyn NetworkService<Output = IpLocation>> = match self {
            Self::IpApi => {
                let service = IpApiService::new(&config.services)?;
                Arc::new(match ip {
                    Some(ip) => service.for_ip(ip),
                    None => service,
                })
            }
            Self::IpApiCo => {
                let service = IpApiCoService::new(&config.services)?;
                Arc::new(match ip {
                    Some(ip) => service.for_ip(ip),
                    None => service,
                })
            }
            Self::Ipstack => {
                let service = IpstackService::from_config(config)?;
                Arc::new(match ip {
                    Some(ip) => service.for_ip(ip),
                    None => service,
                })
            }
        };
        tracing::debug!(provider = %self, "IP lookup service ready");
        Ok(service)
    }
}

impl fmt::Display for IpProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IpApi => "ip-api",
            Self::IpApiCo => "ipapi.co",
            Self::Ipstack => "ipstack",
        };
        f.write_str(name)
    }
}
