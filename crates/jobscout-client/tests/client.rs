//! Integration tests for `JobSearchClient` using wiremock HTTP mocks.

use jobscout_client::{ClientError, ClientSettings, JobSearchClient, JobSource};
use jobscout_core::TargetLocation;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> JobSearchClient {
    let settings = ClientSettings {
        read_timeout_secs: 5,
        connect_timeout_secs: 5,
        user_agent: "jobscout-test/0.1".to_owned(),
        locale: "en-CA".to_owned(),
        country: "Canada".to_owned(),
        page_size: 100,
        radius_km: 100,
        start_date: None,
    };
    JobSearchClient::new(&format!("{}/graphql", server.uri()), settings)
        .expect("client construction should not fail")
}

fn toronto() -> TargetLocation {
    TargetLocation::new("Toronto", 43.6532, -79.3832)
}

#[tokio::test]
async fn search_returns_job_cards() {
    let server = MockServer::start().await;

    let body = json!({
        "data": {
            "searchJobCardsByLocation": {
                "jobCards": [
                    { "jobId": "JOB-CA-0000001", "jobTitle": "Fulfillment Associate", "city": "Brampton", "state": "ON" },
                    { "jobId": "JOB-CA-0000002", "jobTitle": "Sortation Associate", "city": "Mississauga", "state": "ON" }
                ]
            }
        }
    });

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", "Status|unauthenticated|Session|abc"))
        .and(header("country", "Canada"))
        .and(body_partial_json(json!({
            "operationName": "searchJobCardsByLocation",
            "variables": {
                "searchJobRequest": {
                    "locale": "en-CA",
                    "geoQueryClause": { "lat": 43.6532, "lng": -79.3832, "unit": "km", "distance": 100 }
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let cards = client
        .search("Status|unauthenticated|Session|abc", &toronto())
        .await
        .expect("should parse job cards");

    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].job_id, "JOB-CA-0000001");
    assert_eq!(cards[0].job_title.as_deref(), Some("Fulfillment Associate"));
    assert_eq!(cards[1].city.as_deref(), Some("Mississauga"));
}

#[tokio::test]
async fn search_returns_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "data": { "searchJobCardsByLocation": { "jobCards": [] } }
        })))
        .mount(&server)
        .await;

    let cards = test_client(&server)
        .search("token", &toronto())
        .await
        .expect("empty list is not an error");
    assert!(cards.is_empty());
}

#[tokio::test]
async fn http_401_403_and_404_are_auth_failures() {
    for status in [401u16, 403, 404] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .search("stale-token", &toronto())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ClientError::Auth { status: s, .. } if s == status),
            "HTTP {status} should be an auth failure, got {err:?}"
        );
        assert!(err.is_auth_failure());
    }
}

#[tokio::test]
async fn http_500_is_location_local_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .search("token", &toronto())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::UnexpectedStatus { status: 503, .. }
    ));
    assert!(!err.is_auth_failure());
}

#[tokio::test]
async fn rate_limited_is_location_local_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .search("token", &toronto())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::UnexpectedStatus { status: 429, .. }
    ));
}

#[tokio::test]
async fn in_band_unauthorized_error_is_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "data": null,
            "errors": [{
                "errorType": "UnauthorizedException",
                "message": "You are not authorized to make this call."
            }]
        })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .search("token", &toronto())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Auth { status: 200, .. }));
}

#[tokio::test]
async fn in_band_validation_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "data": null,
            "errors": [{
                "errorType": "ValidationError",
                "message": "Validation error of type WrongType"
            }]
        })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .search("token", &toronto())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClientError::Api(ref msg) if msg.contains("WrongType")),
        "got {err:?}"
    );
}

#[tokio::test]
async fn non_json_body_is_deserialize_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .search("token", &toronto())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClientError::Deserialize { ref context, .. } if context.contains("Toronto"))
    );
}

#[tokio::test]
async fn unreachable_host_is_transport_error() {
    let settings = ClientSettings {
        read_timeout_secs: 2,
        connect_timeout_secs: 1,
        user_agent: "jobscout-test/0.1".to_owned(),
        locale: "en-CA".to_owned(),
        country: "Canada".to_owned(),
        page_size: 100,
        radius_km: 100,
        start_date: None,
    };
    let client = JobSearchClient::new("http://127.0.0.1:1/graphql", settings)
        .expect("client construction should not fail");

    let err = client.search("token", &toronto()).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(!err.is_auth_failure());
}

#[tokio::test]
async fn stalled_response_hits_read_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "searchJobCardsByLocation": { "jobCards": [] } } }))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let settings = ClientSettings {
        read_timeout_secs: 1,
        connect_timeout_secs: 1,
        user_agent: "jobscout-test/0.1".to_owned(),
        locale: "en-CA".to_owned(),
        country: "Canada".to_owned(),
        page_size: 100,
        radius_km: 100,
        start_date: None,
    };
    let client = JobSearchClient::new(&format!("{}/graphql", server.uri()), settings)
        .expect("client construction should not fail");

    let err = client.search("token", &toronto()).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(ref e) if e.is_timeout()));
}
