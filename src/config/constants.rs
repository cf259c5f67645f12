//! Configuration constants.
//!
//! This module defines the defaults used when a setting is not provided on the
//! command line or in the environment, plus a few fixed operational values.

use std::time::Duration;

/// Default port for the HTTP front door
pub const DEFAULT_PORT: u16 = 3000;

// Queue policy
/// Maximum number of jobs held across all three priority classes
pub const DEFAULT_QUEUE_MAX_SIZE: usize = 100;
/// Time-to-live of an admitted job in milliseconds.
/// A job still queued after this long is discarded at dequeue time.
pub const DEFAULT_JOB_TTL_MS: u64 = 60_000;

// Upstream
/// Scoring endpoint called by the scheduler
pub const DEFAULT_UPSTREAM_URL: &str = "https://score.hsborges.dev/api/score";
/// Query parameter carrying the subject key
pub const DEFAULT_UPSTREAM_QUERY_PARAM: &str = "cpf";
/// Value sent in the `client-id` header on every upstream call
pub const DEFAULT_CLIENT_ID: &str = "1";
/// Upstream request timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3_000;
/// TCP connect timeout for the upstream client.
/// Never longer than the request timeout; see `initialization::init_client`.
pub const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// Header carrying the client identifier
pub const HEADER_CLIENT_ID: &str = "client-id";

// Circuit breaker
/// Consecutive non-success outcomes that open the breaker
pub const DEFAULT_BREAKER_FAILURE_THRESHOLD: u32 = 3;
/// How long the breaker stays open before allowing a probe, in milliseconds
pub const DEFAULT_BREAKER_OPEN_WINDOW_MS: u64 = 10_000;

// Scheduler cadence
/// Base drain interval in milliseconds
pub const DEFAULT_SCHEDULER_INTERVAL_MS: u64 = 1_000;
/// Drain interval after the upstream answers 429, in milliseconds
pub const DEFAULT_SCHEDULER_PENALTY_INTERVAL_MS: u64 = 3_000;
/// Period of the queue-size sampler in milliseconds
pub const DEFAULT_QUEUE_SIZE_SAMPLE_MS: u64 = 2_000;

// Cache
/// Lifetime of a cached upstream response in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;
/// Longest accepted cache lifetime in seconds (30 days)
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;
/// Entries held by the in-process cache before the least useful are evicted
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 10_000;
/// Prefix of every cache key in the backing store
pub const CACHE_KEY_PREFIX: &str = "cache:score:";

// Storage
/// Prefix of the three queue lists in the backing store
pub const QUEUE_KEY_PREFIX: &str = "queue:";
/// Key of the job id sequence in the backing store
pub const QUEUE_SEQUENCE_KEY: &str = "queue:seq";

// Storage connection retry strategy
/// Initial delay in milliseconds before the first reconnect attempt
pub const STORE_RETRY_INITIAL_DELAY_MS: u64 = 200;
/// Factor by which the reconnect delay is multiplied on each attempt
pub const STORE_RETRY_FACTOR: u64 = 2;
/// Maximum delay between reconnect attempts in seconds
pub const STORE_RETRY_MAX_DELAY_SECS: u64 = 5;
/// Maximum number of connection attempts (including the first one)
pub const STORE_RETRY_MAX_ATTEMPTS: usize = 5;

// HTTP status codes (for clarity and consistency)
/// Upstream status that triggers the cadence penalty
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
