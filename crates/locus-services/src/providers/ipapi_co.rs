//! ipapi.co geolocation provider.

use super::common::{decode, endpoint, non_empty, HttpClient};
use async_trait::async_trait;
use locus_core::{
    Coordinates, IpLocation, LocationError, NetworkService, RequestResult, ServicesConfig,
};
use serde::Deserialize;
use url::Url;

/// Public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://ipapi.co/";

/// ipapi.co lookup. No key required for the free tier.
pub struct IpApiCoService {
    http: HttpClient,
    base_url: String,
    ip: Option<String>,
}

impl IpApiCoService {
    /// Look up the caller's own public address.
    pub fn new(config: &ServicesConfig) -> RequestResult<Self> {
        Self::with_base_url(config, DEFAULT_BASE_URL)
    }

    /// Use a custom endpoint.
    pub fn with_base_url(
        config: &ServicesConfig,
        base_url: impl Into<String>,
    ) -> RequestResult<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
            base_url: base_url.into(),
            ip: None,
        })
    }

    /// Look up a specific address instead of the caller's.
    #[must_use]
    pub fn for_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Request URL for the configured lookup.
    pub fn build_url(&self) -> RequestResult<Url> {
        let path = match &self.ip {
            Some(ip) => format!("{ip}/json/"),
            None => "json/".to_string(),
        };
        endpoint(&self.base_url, &path)
    }

    /// Decode a response body.
    pub fn parse_response(body: &str) -> RequestResult<IpLocation> {
        let response: IpApiCoResponse = decode(body)?;
        if response.error {
            return Err(LocationError::Generic(
                response
                    .reason
                    .unwrap_or_else(|| "General failure".to_string()),
            ));
        }

        let coordinates = match (response.latitude, response.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        };
        let org = non_empty(response.org);

        Ok(IpLocation {
            ip: non_empty(response.ip),
            coordinates,
            city: non_empty(response.city),
            region_name: non_empty(response.region),
            region_code: non_empty(response.region_code),
            country_name: non_empty(response.country_name),
            country_code: non_empty(response.country),
            continent: non_empty(response.continent_code),
            postal_code: non_empty(response.postal),
            timezone: non_empty(response.timezone),
            isp: org.clone(),
            organization: org,
            hostname: None,
        })
    }
}

#[async_trait]
impl NetworkService for IpApiCoService {
    type Output = IpLocation;

    async fn execute(&self) -> RequestResult<IpLocation> {
        let body = self.http.get_text(self.build_url()?, self.service_id()).await?;
        Self::parse_response(&body)
    }

    fn service_id(&self) -> &str {
        "ipapi.co"
    }
}

#[derive(Debug, Deserialize)]
struct IpApiCoResponse {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    ip: Option<String>,
    city: Option<String>,
    region: Option<String>,
    region_code: Option<String>,
    country: Option<String>,
    country_name: Option<String>,
    continent_code: Option<String>,
    postal: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<String>,
    org: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let service = IpApiCoService::new(&ServicesConfig::default()).expect("service");
        assert_eq!(
            service.build_url().expect("url").as_str(),
            "https://ipapi.co/json/"
        );
        assert_eq!(
            service.for_ip("8.8.8.8").build_url().expect("url").as_str(),
            "https://ipapi.co/8.8.8.8/json/"
        );
    }

    #[test]
    fn test_parse_success() {
        let body = r#"{
            "ip": "8.8.8.8",
            "city": "Mountain View",
            "region": "California",
            "region_code": "CA",
            "country": "US",
            "country_name": "United States",
            "continent_code": "NA",
            "postal": "94043",
            "latitude": 37.42301,
            "longitude": -122.083352,
            "timezone": "America/Los_Angeles",
            "org": "GOOGLE"
        }"#;

        let location = IpApiCoService::parse_response(body).expect("parse");
        assert_eq!(location.country_code.as_deref(), Some("US"));
        assert_eq!(location.country_name.as_deref(), Some("United States"));
        assert_eq!(location.region_code.as_deref(), Some("CA"));
        assert_eq!(location.continent.as_deref(), Some("NA"));
        assert_eq!(location.isp.as_deref(), Some("GOOGLE"));
        assert_eq!(location.organization.as_deref(), Some("GOOGLE"));
        assert!(location.coordinates.is_some());
    }

    #[test]
    fn test_parse_error_flag() {
        let body = r#"{"ip":"127.0.0.1","error":true,"reason":"Reserved IP Address"}"#;
        assert_eq!(
            IpApiCoService::parse_response(body).unwrap_err(),
            LocationError::Generic("Reserved IP Address".to_string())
        );
    }
}
