//! HTTP plumbing shared across providers.

use locus_core::{LocationError, RequestResult, ServicesConfig};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// HTTP client plus the timeout it was built with.
///
/// The timeout is kept so a transport timeout can be reported as
/// [`LocationError::Timeout`] with the right interval.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Build a client from the `[services]` configuration.
    ///
    /// # Errors
    /// Returns [`LocationError::InternalError`] if the client cannot be created.
    pub fn new(config: &ServicesConfig) -> RequestResult<Self> {
        let timeout = config.timeout();
        Ok(Self {
            client: build_http_client(timeout, &config.user_agent)?,
            timeout,
        })
    }

    /// Per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and return the body of a 2xx response.
    pub async fn get_text(&self, url: Url, provider: &str) -> RequestResult<String> {
        tracing::debug!(provider, host = url.host_str().unwrap_or_default(), "Sending request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(&e, provider))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(provider, status = status.as_u16(), "Provider returned error status");
            return Err(LocationError::Other(status.as_u16().to_string()));
        }

        response
            .text()
            .await
            .map_err(|e| self.transport_error(&e, provider))
    }

    fn transport_error(&self, error: &reqwest::Error, provider: &str) -> LocationError {
        if error.is_timeout() {
            tracing::warn!(provider, "Request timed out");
            LocationError::timeout(self.timeout)
        } else {
            tracing::warn!(provider, error = %error, "Request failed");
            LocationError::Generic(error.to_string())
        }
    }
}

/// Build a standard HTTP client.
///
/// # Errors
/// Returns [`LocationError::InternalError`] if the client cannot be created.
pub fn build_http_client(timeout: Duration, user_agent: &str) -> RequestResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| {
            tracing::error!("failed to create HTTP client: {e}");
            LocationError::InternalError
        })
}

/// Parse a base URL and append a relative path to it.
///
/// # Errors
/// Returns [`LocationError::InternalError`] for malformed input.
pub fn endpoint(base_url: &str, path: &str) -> RequestResult<Url> {
    Url::parse(base_url)
        .and_then(|base| base.join(path))
        .map_err(|e| {
            tracing::error!(base_url, path, "invalid provider URL: {e}");
            LocationError::InternalError
        })
}

/// Decode a JSON body.
///
/// # Errors
/// Returns [`LocationError::ParsingError`] if the body does not match `T`.
pub fn decode<T: DeserializeOwned>(body: &str) -> RequestResult<T> {
    serde_json::from_str(body).map_err(|e| {
        tracing::debug!("failed to decode provider response: {e}");
        LocationError::ParsingError
    })
}

/// `None` for empty strings.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_http_client_from_config() {
        let config = ServicesConfig::default();
        let client = HttpClient::new(&config).expect("client");
        assert_eq!(client.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_endpoint_joins_path() {
        let url = endpoint("http://ip-api.com/json/", "8.8.8.8").expect("url");
        assert_eq!(url.as_str(), "http://ip-api.com/json/8.8.8.8");

        let url = endpoint("http://ip-api.com/json/", "").expect("url");
        assert_eq!(url.as_str(), "http://ip-api.com/json/");
    }

    #[test]
    fn test_endpoint_rejects_garbage() {
        assert_eq!(
            endpoint("not a url", "x").unwrap_err(),
            LocationError::InternalError
        );
    }

    #[test]
    fn test_decode_maps_to_parsing_error() {
        #[derive(Debug, Deserialize)]
        struct Body {
            #[allow(dead_code)]
            status: String,
        }

        assert!(decode::<Body>(r#"{"status":"OK"}"#).is_ok());
        assert_eq!(
            decode::<Body>("<html>").unwrap_err(),
            LocationError::ParsingError
        );
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("IT".to_string())), Some("IT".to_string()));
    }
}
