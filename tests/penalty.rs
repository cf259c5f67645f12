//! Integration tests for the 429 cadence penalty, end to end over HTTP.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{admit, test_config};
use score_proxy::initialization::{init_client, Storage};
use score_proxy::observability::JobStatus;
use score_proxy::scheduler::TickOutcome;
use score_proxy::upstream::HttpUpstream;
use score_proxy::{assemble, Config, ProxyResources};
use serde_json::json;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_proxy(server: &MockServer) -> ProxyResources {
    let config = Config {
        upstream_url: format!("{}/score", server.uri()),
        disable_cache: true,
        ..test_config()
    };
    let client = init_client(&config).unwrap();
    let upstream = Arc::new(HttpUpstream::from_config(client, &config));
    assemble(config, Storage::in_memory(), upstream)
}

#[tokio::test]
async fn test_429_penalizes_and_success_restores_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("cpf", "limited"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cpf", "fine"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": 1})))
        .mount(&server)
        .await;

    let proxy = http_proxy(&server);
    let mut interval_rx = proxy.scheduler.subscribe_interval();
    assert_eq!(*interval_rx.borrow(), Duration::from_millis(50));

    admit(&proxy.queue, "limited", "normal").await;
    admit(&proxy.queue, "fine", "normal").await;

    let outcome = proxy.scheduler.process_queue().await;
    assert!(matches!(outcome, TickOutcome::Failed { .. }));
    assert!(interval_rx.has_changed().unwrap());
    assert_eq!(*interval_rx.borrow_and_update(), Duration::from_millis(150));
    assert_eq!(proxy.metrics.rate_limit_penalty_count(), 1);
    assert_eq!(proxy.metrics.scheduler_interval_ms_value(), 150);

    let outcome = proxy.scheduler.process_queue().await;
    assert!(matches!(outcome, TickOutcome::Processed { .. }));
    assert_eq!(*interval_rx.borrow_and_update(), Duration::from_millis(50));
    assert_eq!(proxy.scheduler.current_interval(), Duration::from_millis(50));
    assert_eq!(proxy.metrics.scheduler_interval_ms_value(), 50);
}

#[tokio::test]
async fn test_repeated_429_keeps_single_penalty_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let proxy = http_proxy(&server);
    admit(&proxy.queue, "a", "normal").await;
    admit(&proxy.queue, "b", "normal").await;
    proxy.scheduler.process_queue().await;

    let mut interval_rx = proxy.scheduler.subscribe_interval();
    proxy.scheduler.process_queue().await;

    assert!(!interval_rx.has_changed().unwrap(), "no second publish");
    assert_eq!(*interval_rx.borrow_and_update(), Duration::from_millis(150));
    assert_eq!(proxy.metrics.rate_limit_penalty_count(), 2);
    assert_eq!(proxy.metrics.job_count(JobStatus::Failed), 2);
}

#[tokio::test]
async fn test_other_failures_do_not_penalize() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let proxy = http_proxy(&server);
    admit(&proxy.queue, "a", "normal").await;
    proxy.scheduler.process_queue().await;

    assert_eq!(proxy.scheduler.current_interval(), Duration::from_millis(50));
    assert_eq!(proxy.metrics.rate_limit_penalty_count(), 0);
    assert_eq!(proxy.metrics.upstream_error_count("500"), 1);
}
