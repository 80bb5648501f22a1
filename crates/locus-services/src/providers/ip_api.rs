//! ip-api.com geolocation provider.

use super::common::{decode, endpoint, non_empty, HttpClient};
use async_trait::async_trait;
use locus_core::{
    Coordinates, IpLocation, LocationError, NetworkService, RequestResult, ServicesConfig,
};
use serde::Deserialize;
use url::Url;

/// Public endpoint. Free tier is HTTP only.
pub const DEFAULT_BASE_URL: &str = "http://ip-api.com/json/";

/// ip-api.com lookup. No key required.
pub struct IpApiService {
    http: HttpClient,
    base_url: String,
    ip: Option<String>,
    language: Option<String>,
}

impl IpApiService {
    /// Look up the caller's own public address.
    pub fn new(config: &ServicesConfig) -> RequestResult<Self> {
        Self::with_base_url(config, DEFAULT_BASE_URL)
    }

    /// Use a custom endpoint (tests, self-hosted mirrors).
    pub fn with_base_url(
        config: &ServicesConfig,
        base_url: impl Into<String>,
    ) -> RequestResult<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
            base_url: base_url.into(),
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
    pub fn build_url(&self) -> RequestResult<Url> {
        let mut url = endpoint(&self.base_url, self.ip.as_deref().unwrap_or_default())?;
        if let Some(language) = &self.language {
            url.query_pairs_mut().append_pair("lang", language);
        }
        Ok(url)
    }

    /// Decode a response body.
    pub fn parse_response(body: &str) -> RequestResult<IpLocation> {
        let response: IpApiResponse = decode(body)?;
        if response.status != "success" {
            return Err(LocationError::Generic(
                response
                    .message
                    .unwrap_or_else(|| "General failure".to_string()),
            ));
        }

        let coordinates = match (response.lat, response.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };

        Ok(IpLocation {
            ip: non_empty(response.query),
            coordinates,
            city: non_empty(response.city),
            region_name: non_empty(response.region_name),
            region_code: non_empty(response.region),
            country_name: non_empty(response.country),
            country_code: non_empty(response.country_code),
            postal_code: non_empty(response.zip),
            timezone: non_empty(response.timezone),
            isp: non_empty(response.isp),
            organization: non_empty(response.org),
            ..IpLocation::default()
        })
    }
}

#[async_trait]
impl NetworkService for IpApiService {
    type Output = IpLocation;

    async fn execute(&self) -> RequestResult<IpLocation> {
        let body = self.http.get_text(self.build_url()?, self.service_id()).await?;
        Self::parse_response(&body)
    }

    fn service_id(&self) -> &str {
        "ip-api"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    query: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    region: Option<String>,
    region_name: Option<String>,
    city: Option<String>,
    zip: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    timezone: Option<String>,
    isp: Option<String>,
    org: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS: &str = r#"{
        "status": "success",
        "country": "Italy",
        "countryCode": "IT",
        "region": "25",
        "regionName": "Lombardy",
        "city": "Milan",
        "zip": "20121",
        "lat": 45.4642,
        "lon": 9.19,
        "timezone": "Europe/Rome",
        "isp": "Fastweb",
        "org": "",
        "query": "93.34.1.1"
    }"#;

    #[test]
    fn test_build_url() {
        let service = IpApiService::new(&ServicesConfig::default()).expect("service");
        assert_eq!(
            service.build_url().expect("url").as_str(),
            "http://ip-api.com/json/"
        );

        let service = service.for_ip("8.8.8.8");
        assert_eq!(
            service.build_url().expect("url").as_str(),
            "http://ip-api.com/json/8.8.8.8"
        );
    }

    #[test]
    fn test_build_url_with_locale() {
        let config = ServicesConfig {
            locale: Some("it".to_string()),
            ..ServicesConfig::default()
        };
        let service = IpApiService::new(&config).expect("service");
        assert_eq!(
            service.build_url().expect("url").as_str(),
            "http://ip-api.com/json/?lang=it"
        );
    }

    #[test]
    fn test_parse_success() {
        let location = IpApiService::parse_response(SUCCESS).expect("parse");
        assert_eq!(location.ip.as_deref(), Some("93.34.1.1"));
        assert_eq!(location.city.as_deref(), Some("Milan"));
        assert_eq!(location.region_code.as_deref(), Some("25"));
        assert_eq!(location.region_name.as_deref(), Some("Lombardy"));
        assert_eq!(location.country_code.as_deref(), Some("IT"));
        assert_eq!(location.coordinates, Some(Coordinates::new(45.4642, 9.19)));
        assert_eq!(location.organization, None);
    }

    #[test]
    fn test_parse_failure_status() {
        let body = r#"{"status":"fail","message":"reserved range","query":"127.0.0.1"}"#;
        assert_eq!(
            IpApiService::parse_response(body).unwrap_err(),
            LocationError::Generic("reserved range".to_string())
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(
            IpApiService::parse_response("{}").unwrap_err(),
            LocationError::ParsingError
        );
    }
}
