use locus_core::{
    AuthorizationMode, AuthorizationStatus, AutocompleteMatch, Coordinates, DeviceLocationManager,
    DeviceSettings, LocationError, LocusConfig, NetworkService, RequestResult, ServicesConfig,
};
use locus_engine::{Locator, RequestState};
use locus_services::{
    GeocodeQuery, GoogleGeocoderService, GooglePlacesService, IpApiCoService, IpApiService,
    IpstackService, PlacesQuery,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IP_API_BODY: &str = r#"{
    "status": "success",
    "country": "Italy",
    "countryCode": "IT",
    "regionName": "Lombardy",
    "city": "Milan",
    "lat": 45.4642,
    "lon": 9.19,
    "query": "93.34.1.1"
}"#;

struct NoDevice;

impl DeviceLocationManager for NoDevice {
    fn authorization_status(&self) -> AuthorizationStatus {
        AuthorizationStatus::NotDetermined
    }

    fn request_authorization(&self, _mode: AuthorizationMode) {}

    fn update_settings(&self, _settings: &DeviceSettings) {}
}

async fn mount_json(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ip_api_over_http() {
    let server = MockServer::start().await;
    mount_json(&server, "/json/93.34.1.1", 200, IP_API_BODY).await;

    let service = IpApiService::with_base_url(
        &ServicesConfig::default(),
        format!("{}/json/", server.uri()),
    )
    .expect("service")
    .for_ip("93.34.1.1");

    let location = service.execute().await.expect("lookup");
    assert_eq!(location.city.as_deref(), Some("Milan"));
    assert_eq!(location.coordinates, Some(Coordinates::new(45.4642, 9.19)));
}

#[tokio::test]
async fn test_error_status_maps_to_other() {
    let server = MockServer::start().await;
    mount_json(&server, "/json/", 503, "Service Unavailable").await;

    let service = IpApiCoService::with_base_url(&ServicesConfig::default(), server.uri())
        .expect("service");

    assert_eq!(
        service.execute().await.unwrap_err(),
        LocationError::Other("503".to_string())
    );
}

#[tokio::test]
async fn test_malformed_body_maps_to_parsing_error() {
    let server = MockServer::start().await;
    mount_json(&server, "/json/", 200, "<html>maintenance</html>").await;

    let service = IpApiService::with_base_url(
        &ServicesConfig::default(),
        format!("{}/json/", server.uri()),
    )
    .expect("service");

    assert_eq!(
        service.execute().await.unwrap_err(),
        LocationError::ParsingError
    );
}

#[tokio::test]
async fn test_slow_provider_maps_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(IP_API_BODY)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = ServicesConfig {
        timeout_secs: 1,
        ..ServicesConfig::default()
    };
    let service =
        IpApiService::with_base_url(&config, format!("{}/json/", server.uri())).expect("service");

    assert_eq!(
        service.execute().await.unwrap_err(),
        LocationError::timeout(Duration::from_secs(1))
    );
}

#[tokio::test]
async fn test_ipstack_sends_access_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check"))
        .and(query_param("access_key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"ip":"93.34.1.1","country_code":"IT","city":"Milan","latitude":45.46,"longitude":9.19}"#,
        ))
        .mount(&server)
        .await;

    let service = IpstackService::with_base_url(
        &ServicesConfig::default(),
        "secret",
        format!("{}/", server.uri()),
    )
    .expect("service");

    let location = service.execute().await.expect("lookup");
    assert_eq!(location.country_code.as_deref(), Some("IT"));
}

#[tokio::test]
async fn test_google_geocoder_reverse() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/api/geocode/json"))
        .and(query_param("latlng", "45.4641,9.1919"))
        .and(query_param("key", "KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status":"OK","results":[{"place_id":"duomo","formatted_address":"Piazza del Duomo, Milano"}]}"#,
        ))
        .mount(&server)
        .await;

    let service = GoogleGeocoderService::with_base_url(
        &ServicesConfig::default(),
        "KEY",
        GeocodeQuery::Coordinates(Coordinates::new(45.4641, 9.1919)),
        format!("{}/maps/api/", server.uri()),
    )
    .expect("service");

    let places = service.execute().await.expect("geocode");
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].place_id.as_deref(), Some("duomo"));
}

#[tokio::test]
async fn test_google_places_autocomplete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/api/place/autocomplete/json"))
        .and(query_param("input", "Duomo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status":"OK","predictions":[{"place_id":"duomo","description":"Duomo di Milano"}]}"#,
        ))
        .mount(&server)
        .await;

    let service = GooglePlacesService::with_base_url(
        &ServicesConfig::default(),
        "KEY",
        PlacesQuery::Autocomplete("Duomo".to_string()),
        format!("{}/maps/api/", server.uri()),
    )
    .expect("service");

    let matches = service.execute().await.expect("autocomplete");
    assert!(matches!(
        matches.as_slice(),
        [AutocompleteMatch::Partial(m)] if m.place_id == "duomo"
    ));
}

#[tokio::test]
async fn test_lookup_through_locator() {
    let server = MockServer::start().await;
    mount_json(&server, "/json/", 200, IP_API_BODY).await;

    let service = IpApiService::with_base_url(
        &ServicesConfig::default(),
        format!("{}/json/", server.uri()),
    )
    .expect("service");
    let locator = Locator::new(LocusConfig::default(), Arc::new(NoDevice));

    let request = locator
        .ip_location(Arc::new(service))
        .await
        .expect("add lookup");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<RequestResult<_>>();
    request.subscribe(move |result| {
        let _ = tx.send(result.clone());
    });

    let result = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("result in time")
        .expect("channel open");
    let location = result.expect("lookup succeeded");
    assert_eq!(location.country_code.as_deref(), Some("IT"));

    locator.shutdown().await.expect("shutdown");
    assert_eq!(request.state(), RequestState::Expired);
}
