//! Response schema shared by the Google Maps web services.

use super::common::non_empty;
use locus_core::{Coordinates, LocationError, Place};
use serde::Deserialize;

/// Default root for Google Maps web services.
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/";

/// Map a top-level `status` to a result.
///
/// `Ok(true)` means results follow, `Ok(false)` means a valid empty answer.
pub(crate) fn check_status(status: &str, message: Option<&str>) -> Result<bool, LocationError> {
    match status {
        "OK" => Ok(true),
        "ZERO_RESULTS" => Ok(false),
        "REQUEST_DENIED" => {
            tracing::warn!(error_message = message, "Google rejected the API key");
            Err(LocationError::MissingApiKey)
        }
        other => {
            tracing::warn!(status = other, error_message = message, "Google request failed");
            Err(LocationError::Other(other.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleResult {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geometry {
    pub location: Option<LatLng>,
    pub location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl GoogleResult {
    fn component(&self, types: &[&str]) -> Option<&AddressComponent> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| types.contains(&t.as_str())))
    }

    fn long_name(&self, types: &[&str]) -> Option<String> {
        self.component(types).map(|c| c.long_name.clone())
    }

    pub fn into_place(self) -> Place {
        let (coordinates, location_type) = match &self.geometry {
            Some(geometry) => (
                geometry
                    .location
                    .as_ref()
                    .map(|l| Coordinates::new(l.lat, l.lng)),
                geometry.location_type.clone(),
            ),
            None => (None, None),
        };

        Place {
            country: self.long_name(&["country"]),
            country_code: self.component(&["country"]).map(|c| c.short_name.clone()),
            administrative_area: self.long_name(&["administrative_area_level_1"]),
            sub_administrative_area: self.long_name(&["administrative_area_level_2"]),
            locality: self.long_name(&["locality"]),
            thoroughfare: self.long_name(&["neighborhood", "route"]),
            postal_code: self.long_name(&["postal_code"]),
            name: non_empty(self.name.clone()).or_else(|| self.formatted_address.clone()),
            place_id: self.place_id,
            formatted_address: self.formatted_address,
            coordinates,
            location_type,
        }
    }
}
