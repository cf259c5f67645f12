//! Main application entry point (proxy binary).
//!
//! This is a thin wrapper around the `score_proxy` library that handles:
//! - Environment variable loading (.env file)
//! - Command-line argument parsing
//! - Logger initialization
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use score_proxy::initialization::init_logger_with;
use score_proxy::{run_proxy, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; settings then come from the environment and flags
    let _ = dotenvy::dotenv();

    let config = Config::parse();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    if let Err(e) = run_proxy(config).await {
        log::error!("score_proxy error: {:#}", e);
        eprintln!("score_proxy error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
