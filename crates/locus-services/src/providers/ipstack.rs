//! ipstack geolocation provider.

use super::common::{decode, endpoint, non_empty, HttpClient};
use async_trait::async_trait;
use locus_core::{
    Coordinates, IpLocation, LocationError, LocusConfig, NetworkService, RequestResult,
    ServicesConfig,
};
use serde::Deserialize;
use url::Url;

/// Public endpoint. Free tier is HTTP only.
pub const DEFAULT_BASE_URL: &str = "http://api.ipstack.com/";

/// ipstack lookup. Requires an access key.
pub struct IpstackService {
    http: HttpClient,
    base_url: String,
    api_key: String,
    ip: Option<String>,
    language: Option<String>,
}

impl IpstackService {
    /// Create a provider with an explicit access key.
    pub fn new(config: &ServicesConfig, api_key: impl Into<String>) -> RequestResult<Self> {
        Self::with_base_url(config, api_key, DEFAULT_BASE_URL)
    }

    /// Create a provider using `credentials.ipstack_api_key`.
    ///
    /// # Errors
    /// Returns [`LocationError::MissingApiKey`] when no key is configured.
    pub fn from_config(config: &LocusConfig) -> RequestResult<Self> {
        let key = non_empty(config.credentials.ipstack_api_key.clone())
            .ok_or(LocationError::MissingApiKey)?;
        Self::new(&config.services, key)
    }

    /// Use a custom endpoint.
    pub fn with_base_url(
        config: &ServicesConfig,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> RequestResult<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
            ip: None,
            language: config.locale.clone(),
        })
    }

    /// Look up a specific address instead of the caller's.
    #[must_use]
    pub fn for_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Request URL for the configured lookup.
    ///
    /// # Errors
    /// Returns [`LocationError::MissingApiKey`] for an empty key.
    pub fn build_url(&self) -> RequestResult<Url> {
        if self.api_key.is_empty() {
            return Err(LocationError::MissingApiKey);
        }

        let mut url = endpoint(&self.base_url, self.ip.as_deref().unwrap_or("check"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("access_key", &self.api_key);
            if let Some(language) = &self.language {
                query.append_pair("language", language);
            }
        }
        Ok(url)
    }

    /// Decode a response body.
    pub fn parse_response(body: &str) -> RequestResult<IpLocation> {
        let response: IpstackResponse = decode(body)?;

        if let Some(error) = response.error {
            tracing::debug!(code = error.code, kind = ?error.kind, "ipstack error");
            return Err(match error.code {
                101..=103 => LocationError::MissingApiKey,
                code => LocationError::Other(code.to_string()),
            });
        }
        if response.success == Some(false) {
            return Err(LocationError::Generic("General failure".to_string()));
        }

        let coordinates = match (response.latitude, response.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        };

        Ok(IpLocation {
            ip: non_empty(response.ip),
            coordinates,
            city: non_empty(response.city),
            region_name: non_empty(response.region_name),
            region_code: non_empty(response.region_code),
            country_name: non_empty(response.country_name),
            country_code: non_empty(response.country_code),
            continent: non_empty(response.continent_name),
            postal_code: non_empty(response.zip),
            timezone: response.time_zone.and_then(|tz| non_empty(tz.id)),
            isp: response.connection.and_then(|c| non_empty(c.isp)),
            organization: None,
            hostname: non_empty(response.hostname),
        })
    }
}

#[async_trait]
impl NetworkService for IpstackService {
    type Output = IpLocation;

    async fn execute(&self) -> RequestResult<IpLocation> {
        let body = self.http.get_text(self.build_url()?, self.service_id()).await?;
        Self::parse_response(&body)
    }

    fn service_id(&self) -> &str {
        "ipstack"
    }
}

#[derive(Debug, Deserialize)]
struct IpstackResponse {
    success: Option<bool>,
    error: Option<IpstackError>,
    ip: Option<String>,
    hostname: Option<String>,
    continent_name: Option<String>,
    country_code: Option<String>,
    country_name: Option<String>,
    region_code: Option<String>,
    region_name: Option<String>,
    city: Option<String>,
    zip: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    time_zone: Option<IpstackTimeZone>,
    connection: Option<IpstackConnection>,
}

#[derive(Debug, Deserialize)]
struct IpstackError {
    code: u32,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpstackTimeZone {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpstackConnection {
    isp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let service = IpstackService::new(&ServicesConfig::default(), "secret").expect("service");
        assert_eq!(
            service.build_url().expect("url").as_str(),
            "http://api.ipstack.com/check?access_key=secret"
        );
        assert_eq!(
            service.for_ip("8.8.8.8").build_url().expect("url").as_str(),
            "http://api.ipstack.com/8.8.8.8?access_key=secret"
        );
    }

    #[test]
    fn test_missing_key() {
        let config = LocusConfig::default();
        assert!(matches!(
            IpstackService::from_config(&config),
            Err(LocationError::MissingApiKey)
        ));

        let service = IpstackService::new(&config.services, "").expect("service");
        assert_eq!(service.build_url().unwrap_err(), LocationError::MissingApiKey);
    }

    #[test]
    fn test_parse_success() {
        let body = r#"{
            "ip": "134.201.250.155",
            "continent_name": "North America",
            "country_code": "US",
            "country_name": "United States",
            "region_code": "CA",
            "region_name": "California",
            "city": "Los Angeles",
            "zip": "90013",
            "latitude": 34.0453,
            "longitude": -118.2413,
            "time_zone": { "id": "America/Los_Angeles" },
            "connection": { "asn": 25876, "isp": "Los Angeles Department of Water & Power" }
        }"#;

        let location = IpstackService::parse_response(body).expect("parse");
        assert_eq!(location.city.as_deref(), Some("Los Angeles"));
        assert_eq!(location.continent.as_deref(), Some("North America"));
        assert_eq!(location.timezone.as_deref(), Some("America/Los_Angeles"));
        assert_eq!(
            location.isp.as_deref(),
            Some("Los Angeles Department of Water & Power")
        );
    }

    #[test]
    fn test_parse_error_codes() {
        let invalid_key = r#"{"success":false,"error":{"code":101,"type":"invalid_access_key","info":"..."}}"#;
        assert_eq!(
            IpstackService::parse_response(invalid_key).unwrap_err(),
            LocationError::MissingApiKey
        );

        let quota = r#"{"success":false,"error":{"code":104,"type":"usage_limit_reached"}}"#;
        assert_eq!(
            IpstackService::parse_response(quota).unwrap_err(),
            LocationError::Other("104".to_string())
        );
    }
}
