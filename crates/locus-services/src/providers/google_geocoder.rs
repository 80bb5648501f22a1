//! Google Geocoding API provider.
//!
//! Forward geocoding resolves an address string, reverse geocoding resolves
//! coordinates. Both produce a list of [`Place`]s.

use super::common::{decode, endpoint, non_empty, HttpClient};
use super::google::{check_status, GoogleResult, DEFAULT_BASE_URL};
use async_trait::async_trait;
use locus_core::{
    Coordinates, LocationError, LocusConfig, NetworkService, Place, RequestResult, ServicesConfig,
};
use serde::Deserialize;
use url::Url;

/// What to geocode.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeQuery {
    /// Address to coordinates.
    Address(String),
    /// Coordinates to address.
    Coordinates(Coordinates),
}

/// Google geocoder.
pub struct GoogleGeocoderService {
    http: HttpClient,
    base_url: String,
    api_key: String,
    query: GeocodeQuery,
    language: Option<String>,
    region: Option<String>,
}

impl GoogleGeocoderService {
    /// Create a geocoder with an explicit API key.
    pub fn new(
        config: &ServicesConfig,
        api_key: impl Into<String>,
        query: GeocodeQuery,
    ) -> RequestResult<Self> {
        Self::with_base_url(config, api_key, query, DEFAULT_BASE_URL)
    }

    /// Create a geocoder using `credentials.google_api_key`.
    ///
    /// # Errors
    /// Returns [`LocationError::MissingApiKey`] when no key is configured.
    pub fn from_config(config: &LocusConfig, query: GeocodeQuery) -> RequestResult<Self> {
        let key = non_empty(config.credentials.google_api_key.clone())
            .ok_or(LocationError::MissingApiKey)?;
        Self::new(&config.services, key, query)
    }

    /// Use a custom Maps API root.
    pub fn with_base_url(
        config: &ServicesConfig,
        api_key: impl Into<String>,
        query: GeocodeQuery,
        base_url: impl Into<String>,
    ) -> RequestResult<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
            query,
            language: config.locale.clone(),
            region: None,
        })
    }

    /// Response language, overriding `services.locale`.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Region bias as a ccTLD (`"it"`, `"us"`).
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Query being resolved.
    #[must_use]
    pub fn query(&self) -> &GeocodeQuery {
        &self.query
    }

    /// Request URL for the configured query.
    pub fn build_url(&self) -> RequestResult<Url> {
        if self.api_key.is_empty() {
            return Err(LocationError::MissingApiKey);
        }

        let mut url = endpoint(&self.base_url, "geocode/json")?;
        {
            let mut query = url.query_pairs_mut();
            match &self.query {
                GeocodeQuery::Address(address) => query.append_pair("address", address),
                GeocodeQuery::Coordinates(coordinates) => {
                    query.append_pair("latlng", &coordinates.comma_lat_lng())
                }
            };
            query.append_pair("key", &self.api_key);
            if let Some(language) = &self.language {
                query.append_pair("language", language);
            }
            if let Some(region) = &self.region {
                query.append_pair("region", region);
            }
        }
        Ok(url)
    }

    /// Decode a response body.
    pub fn parse_response(body: &str) -> RequestResult<Vec<Place>> {
        let response: GeocodeResponse = decode(body)?;
        if !check_status(&response.status, response.error_message.as_deref())? {
            return Ok(Vec::new());
        }
        Ok(response
            .results
            .into_iter()
            .map(GoogleResult::into_place)
            .collect())
    }
}

#[async_trait]
impl NetworkService for GoogleGeocoderService {
    type Output = Vec<Place>;

    async fn execute(&self) -> RequestResult<Vec<Place>> {
        let body = self.http.get_text(self.build_url()?, self.service_id()).await?;
        let places = Self::parse_response(&body)?;
        tracing::debug!(count = places.len(), "Geocoding finished");
        Ok(places)
    }

    fn service_id(&self) -> &str {
        "google-geocoder"
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GoogleResult>,
}
