//! Upstream scoring API client.
//!
//! The scheduler talks to the upstream through the `Upstream` trait so tests
//! can script outcomes without a server. `HttpUpstream` is the production
//! implementation: one GET per job with the subject key as a query parameter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;

use crate::config::{Config, HEADER_CLIENT_ID};
use crate::error_handling::{classify_reqwest_error, classify_status, UpstreamFailure};

/// A scoring backend.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetches the payload for `subject_key`.
    ///
    /// # Errors
    ///
    /// Returns the classified `UpstreamFailure` for timeouts, non-2xx
    /// statuses, connection errors and undecodable bodies.
    async fn fetch(&self, subject_key: &str) -> Result<Value, UpstreamFailure>;
}

/// HTTP implementation of `Upstream`.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Arc<reqwest::Client>,
    url: String,
    query_param: String,
    client_id: String,
    timeout: Duration,
}

impl HttpUpstream {
    /// Creates a client for `url`.
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `url` - Scoring endpoint
    /// * `query_param` - Name of the query parameter carrying the subject key
    /// * `client_id` - Value of the `client-id` header
    /// * `timeout` - Upper bound for one call, body included
    pub fn new(
        client: Arc<reqwest::Client>,
        url: impl Into<String>,
        query_param: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        HttpUpstream {
            client,
            url: url.into(),
            query_param: query_param.into(),
            client_id: client_id.into(),
            timeout,
        }
    }

    /// Creates a client from the proxy configuration.
    pub fn from_config(client: Arc<reqwest::Client>, config: &Config) -> Self {
        Self::new(
            client,
            config.upstream_url.clone(),
            config.upstream_query_param.clone(),
            config.client_id.clone(),
            config.request_timeout(),
        )
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, subject_key: &str) -> Result<Value, UpstreamFailure> {
        let response = self
            .client
            .get(&self.url)
            .query(&[(self.query_param.as_str(), subject_key)])
            .header(HEADER_CLIENT_ID, &self.client_id)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status().as_u16();
        if let Some(failure) = classify_status(status) {
            return Err(failure);
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamFailure::Timeout
            } else {
                UpstreamFailure::Unknown {
                    status: Some(status),
                    message: format!("invalid upstream body: {}", e),
                }
            }
        })
    }
}
