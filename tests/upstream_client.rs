//! Integration tests for the HTTP upstream against a mock server.

use std::sync::Arc;
use std::time::Duration;

use score_proxy::error_handling::UpstreamFailure;
use score_proxy::initialization::init_client;
use score_proxy::upstream::{HttpUpstream, Upstream};
use score_proxy::Config;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn upstream_for(server: &MockServer, timeout_ms: u64) -> HttpUpstream {
    let config = Config {
        upstream_url: format!("{}/score", server.uri()),
        request_timeout_ms: timeout_ms,
        ..Config::default()
    };
    let client = init_client(&config).expect("client should build");
    HttpUpstream::from_config(client, &config)
}

#[tokio::test]
async fn test_success_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/score"))
        .and(query_param("cpf", "12345678900"))
        .and(header("client-id", "1"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": 812})))
        .expect(1)
        .mount(&server)
        .await;

    let upstream = upstream_for(&server, 1_000);
    let body = upstream.fetch("12345678900").await.unwrap();
    assert_eq!(body, json!({"score": 812}));
}

#[tokio::test]
async fn test_429_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let upstream = upstream_for(&server, 1_000);
    assert_eq!(
        upstream.fetch("k").await.unwrap_err(),
        UpstreamFailure::RateLimited
    );
}

#[tokio::test]
async fn test_5xx_is_server_error_with_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let upstream = upstream_for(&server, 1_000);
    assert_eq!(
        upstream.fetch("k").await.unwrap_err(),
        UpstreamFailure::ServerError(503)
    );
}

#[tokio::test]
async fn test_other_status_is_unknown_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let upstream = upstream_for(&server, 1_000);
    let failure = upstream.fetch("k").await.unwrap_err();
    assert!(matches!(
        failure,
        UpstreamFailure::Unknown {
            status: Some(404),
            ..
        }
    ));
}

#[tokio::test]
async fn test_slow_response_is_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"score": 1}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let upstream = upstream_for(&server, 100);
    assert_eq!(
        upstream.fetch("k").await.unwrap_err(),
        UpstreamFailure::Timeout
    );
}

#[tokio::test]
async fn test_non_json_body_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let upstream = upstream_for(&server, 1_000);
    assert!(matches!(
        upstream.fetch("k").await.unwrap_err(),
        UpstreamFailure::Unknown {
            status: Some(200),
            ..
        }
    ));
}

#[tokio::test]
async fn test_connection_refused_is_unknown_without_status() {
    // Nothing listens on the port once the server is dropped
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let config = Config {
        upstream_url: format!("{}/score", uri),
        request_timeout_ms: 1_000,
        ..Config::default()
    };
    let upstream = HttpUpstream::new(
        init_client(&config).unwrap(),
        config.upstream_url.clone(),
        "cpf",
        "1",
        Duration::from_millis(1_000),
    );

    let failure = upstream.fetch("k").await.unwrap_err();
    assert!(matches!(failure, UpstreamFailure::Unknown { status: None, .. }));
}

#[tokio::test]
async fn test_custom_query_param_and_client_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("document", "abc"))
        .and(header("client-id", "tenant-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(reqwest::Client::new());
    let upstream = HttpUpstream::new(
        client,
        format!("{}/score", server.uri()),
        "document",
        "tenant-7",
        Duration::from_secs(1),
    );
    assert_eq!(upstream.fetch("abc").await.unwrap(), json!({"ok": true}));
}
