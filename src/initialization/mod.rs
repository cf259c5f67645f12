//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - Logger
//! - Upstream HTTP client
//! - Storage backend (process memory or Redis)

mod client;
mod logger;
mod storage;

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;
pub use storage::{init_storage, Storage};
