//! HTTP client initialization.

use std::sync::Arc;

use crate::config::{Config, TCP_CONNECT_TIMEOUT};
use reqwest::ClientBuilder;

/// Initializes the HTTP client used for upstream calls.
///
/// The client carries the request timeout, so every call is bounded even if
/// the upstream accepts the connection and never answers. The connect timeout
/// is `TCP_CONNECT_TIMEOUT`, capped at the request timeout.
///
/// # Arguments
///
/// * `config` - Proxy configuration (request timeout)
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(config: &Config) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let timeout = config.request_timeout();
    let client = ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(TCP_CONNECT_TIMEOUT.min(timeout))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(Arc::new(client))
}
