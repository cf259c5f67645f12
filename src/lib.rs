//! score_proxy library: admission-control proxy for a rate-limited scoring API
//!
//! Requests are admitted into a bounded three-class priority queue and drained
//! one per tick by a scheduler that controls its own cadence. A circuit breaker
//! stops calling a failing upstream, a 429 slows the cadence down until the
//! next success, and a response cache avoids duplicate calls and serves stale
//! answers when the upstream fails.
//!
//! # Example
//!
//! ```no_run
//! use score_proxy::{run_proxy, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     queue_max_size: 50,
//!     scheduler_interval_ms: 500,
//!     scheduler_penalty_interval_ms: 2_000,
//!     ..Default::default()
//! };
//!
//! run_proxy(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

#![warn(missing_docs)]

pub mod breaker;
pub mod cache;
pub mod config;
pub mod error_handling;
pub mod initialization;
pub mod observability;
pub mod queue;
mod run;
pub mod scheduler;
pub mod server;
pub mod storage;
pub mod upstream;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel};
pub use run::{
    assemble, init_proxy_resources, run_proxy, shutdown_gracefully, ProxyResources,
};
