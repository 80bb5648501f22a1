//! Google Places autocomplete and place details.

use super::common::{decode, endpoint, non_empty, HttpClient};
use super::google::{check_status, GoogleResult, DEFAULT_BASE_URL};
use async_trait::async_trait;
use locus_core::{
    AutocompleteMatch, LocationError, LocusConfig, NetworkService, PartialMatch, RequestResult,
    ServicesConfig,
};
use serde::Deserialize;
use url::Url;

/// Places operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacesQuery {
    /// Suggestions for partially typed text.
    Autocomplete(String),
    /// Full details of a place id returned by an earlier suggestion.
    Details(String),
}

/// Google Places client producing [`AutocompleteMatch`]es.
pub struct GooglePlacesService {
    http: HttpClient,
    base_url: String,
    api_key: String,
    query: PlacesQuery,
    types: Vec<String>,
    countries: Vec<String>,
    language: Option<String>,
}

impl GooglePlacesService {
    /// Create a client with an explicit API key.
    pub fn new(
        config: &ServicesConfig,
        api_key: impl Into<String>,
        query: PlacesQuery,
    ) -> RequestResult<Self> {
        Self::with_base_url(config, api_key, query, DEFAULT_BASE_URL)
    }

    /// Create a client using `credentials.google_api_key`.
    ///
    /// # Errors
    /// Returns [`LocationError::MissingApiKey`] when no key is configured.
    pub fn from_config(config: &LocusConfig, query: PlacesQuery) -> RequestResult<Self> {
        let key = non_empty(config.credentials.google_api_key.clone())
            .ok_or(LocationError::MissingApiKey)?;
        Self::new(&config.services, key, query)
    }

    /// Use a custom Maps API root.
    pub fn with_base_url(
        config: &ServicesConfig,
        api_key: impl Into<String>,
        query: PlacesQuery,
        base_url: impl Into<String>,
    ) -> RequestResult<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
            query,
            types: Vec::new(),
            countries: Vec::new(),
            language: config.locale.clone(),
        })
    }

    /// Restrict suggestions to place types (`"geocode"`, `"establishment"`).
    #[must_use]
    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict suggestions to ISO 3166-1 country codes.
    #[must_use]
    pub fn countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = countries
            .into_iter()
            .map(|c| c.into().to_lowercase())
            .collect();
        self
    }

    /// Response language, overriding `services.locale`.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Request URL for the configured operation.
    pub fn build_url(&self) -> RequestResult<Url> {
        if self.api_key.is_empty() {
            return Err(LocationError::MissingApiKey);
        }

        let path = match self.query {
            PlacesQuery::Autocomplete(_) => "place/autocomplete/json",
            PlacesQuery::Details(_) => "place/details/json",
        };
        let mut url = endpoint(&self.base_url, path)?;
        {
            let mut query = url.query_pairs_mut();
            match &self.query {
                PlacesQuery::Autocomplete(input) => {
                    query.append_pair("input", input);
                    if !self.types.is_empty() {
                        query.append_pair("types", &self.types.join("|"));
                    }
                    if !self.countries.is_empty() {
                        let components: Vec<String> = self
                            .countries
                            .iter()
                            .map(|c| format!("country:{c}"))
                            .collect();
                        query.append_pair("components", &components.join("|"));
                    }
                }
                PlacesQuery::Details(place_id) => {
                    query.append_pair("placeid", place_id);
                }
            }
            if let Some(language) = &self.language {
                query.append_pair("language", language);
            }
            query.append_pair("key", &self.api_key);
        }
        Ok(url)
    }

    /// Decode an autocomplete response body.
    pub fn parse_autocomplete(body: &str) -> RequestResult<Vec<AutocompleteMatch>> {
        let response: AutocompleteResponse = decode(body)?;
        if !check_status(&response.status, response.error_message.as_deref())? {
            return Ok(Vec::new());
        }

        Ok(response
            .predictions
            .into_iter()
            .map(|p| {
                let (main_text, secondary_text) = match p.structured_formatting {
                    Some(f) => (non_empty(f.main_text), non_empty(f.secondary_text)),
                    None => (None, None),
                };
                AutocompleteMatch::Partial(PartialMatch {
                    place_id: p.place_id,
                    description: p.description,
                    main_text,
                    secondary_text,
                    types: p.types,
                })
            })
            .collect())
    }

    /// Decode a place details response body.
    pub fn parse_details(body: &str) -> RequestResult<Vec<AutocompleteMatch>> {
        let response: DetailsResponse = decode(body)?;
        if !check_status(&response.status, response.error_message.as_deref())? {
            return Ok(Vec::new());
        }

        let result = response.result.ok_or(LocationError::ParsingError)?;
        Ok(vec![AutocompleteMatch::Place(result.into_place())])
    }

    /// Decode a response body for the configured operation.
    pub fn parse_response(&self, body: &str) -> RequestResult<Vec<AutocompleteMatch>> {
        match self.query {
            PlacesQuery::Autocomplete(_) => Self::parse_autocomplete(body),
            PlacesQuery::Details(_) => Self::parse_details(body),
        }
    }
}

#[async_trait]
impl NetworkService for GooglePlacesService {
    type Output = Vec<AutocompleteMatch>;

    async fn execute(&self) -> RequestResult<Vec<AutocompleteMatch>> {
        let body = self.http.get_text(self.build_url()?, self.service_id()).await?;
        self.parse_response(&body)
    }

    fn service_id(&self) -> &str {
        "google-places"
    }
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    place_id: String,
    description: String,
    structured_formatting: Option<StructuredFormatting>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StructuredFormatting {
    main_text: Option<String>,
    secondary_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    error_message: Option<String>,
    result: Option<GoogleResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places(query: PlacesQuery) -> GooglePlacesService {
        GooglePlacesService::new(&ServicesConfig::default(), "KEY", query).expect("service")
    }

    #[test]
    fn test_autocomplete_url() {
        let url = places(PlacesQuery::Autocomplete("Via Tor".to_string()))
            .types(["address"])
            .countries(["IT", "ch"])
            .language("it")
            .build_url()
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://maps.googleapis.com/maps/api/place/autocomplete/json?input=Via+Tor&types=address&components=country%3Ait%7Ccountry%3Ach&language=it&key=KEY"
        );
    }

    #[test]
    fn test_details_url() {
        let url = places(PlacesQuery::Details("ChIJ123".to_string()))
            .build_url()
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://maps.googleapis.com/maps/api/place/details/json?placeid=ChIJ123&key=KEY"
        );
    }

    #[test]
    fn test_parse_autocomplete() {
        let body = r#"{
            "status": "OK",
            "predictions": [{
                "place_id": "ChIJ123",
                "description": "Via Torino, Milan, Italy",
                "structured_formatting": { "main_text": "Via Torino", "secondary_text": "Milan, Italy" },
                "types": ["route", "geocode"]
            }]
        }"#;

        let matches = GooglePlacesService::parse_autocomplete(body).expect("parse");
        assert_eq!(
            matches,
            vec![AutocompleteMatch::Partial(PartialMatch {
                place_id: "ChIJ123".to_string(),
                description: "Via Torino, Milan, Italy".to_string(),
                main_text: Some("Via Torino".to_string()),
                secondary_text: Some("Milan, Italy".to_string()),
                types: vec!["route".to_string(), "geocode".to_string()],
            })]
        );
    }

    #[test]
    fn test_parse_details() {
        let body = r#"{
            "status": "OK",
            "result": {
                "place_id": "ChIJ123",
                "name": "Via Torino",
                "formatted_address": "Via Torino, 20123 Milano MI, Italy",
                "geometry": { "location": { "lat": 45.46, "lng": 9.18 } }
            }
        }"#;

        let matches = GooglePlacesService::parse_details(body).expect("parse");
        let [AutocompleteMatch::Place(place)] = matches.as_slice() else {
            panic!("expected one place, got {matches:?}");
        };
        assert_eq!(place.name.as_deref(), Some("Via Torino"));
        assert_eq!(place.place_id.as_deref(), Some("ChIJ123"));
    }

    #[test]
    fn test_parse_details_without_result() {
        assert_eq!(
            GooglePlacesService::parse_details(r#"{"status":"OK"}"#).unwrap_err(),
            LocationError::ParsingError
        );
        assert!(GooglePlacesService::parse_details(r#"{"status":"ZERO_RESULTS"}"#)
            .expect("parse")
            .is_empty());
    }

    #[test]
    fn test_parse_request_denied() {
        let body = r#"{"status":"REQUEST_DENIED","error_message":"This API project is not authorized","predictions":[]}"#;
        assert_eq!(
            GooglePlacesService::parse_autocomplete(body).unwrap_err(),
            LocationError::MissingApiKey
        );
    }
}
