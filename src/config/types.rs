//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration. Every option can also be set through the environment,
//! which is how the proxy is normally deployed.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::*;
use crate::error_handling::ConfigError;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Proxy configuration.
///
/// Parsed by `clap` from flags or environment variables. The `Default` impl
/// mirrors the CLI defaults so the library can be configured programmatically.
///
/// # Examples
///
/// ```no_run
/// use score_proxy::Config;
///
/// let config = Config {
///     queue_max_size: 2,
///     breaker_failure_threshold: 2,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "score_proxy",
    about = "Queues, throttles and caches calls to a rate-limited scoring API."
)]
pub struct Config {
    /// Port the HTTP front door listens on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, env = "LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Maximum number of queued jobs across all priority classes
    #[arg(long, env = "QUEUE_MAX_SIZE", default_value_t = DEFAULT_QUEUE_MAX_SIZE)]
    pub queue_max_size: usize,

    /// Lifetime of a queued job in milliseconds
    #[arg(long, env = "JOB_TTL_MS", default_value_t = DEFAULT_JOB_TTL_MS)]
    pub job_ttl_ms: u64,

    /// Upstream scoring endpoint
    #[arg(long, env = "UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub upstream_url: String,

    /// Query parameter that carries the subject key, on `/proxy/score` and upstream
    #[arg(long, env = "UPSTREAM_QUERY_PARAM", default_value = DEFAULT_UPSTREAM_QUERY_PARAM)]
    pub upstream_query_param: String,

    /// Value of the `client-id` header sent upstream
    #[arg(long, env = "UPSTREAM_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,

    /// Upstream request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    /// Consecutive failures that open the circuit breaker
    #[arg(long, env = "BREAKER_FAILURE_THRESHOLD", default_value_t = DEFAULT_BREAKER_FAILURE_THRESHOLD)]
    pub breaker_failure_threshold: u32,

    /// Milliseconds the breaker stays open before a probe is allowed
    #[arg(long, env = "BREAKER_OPEN_WINDOW_MS", default_value_t = DEFAULT_BREAKER_OPEN_WINDOW_MS)]
    pub breaker_open_window_ms: u64,

    /// Base drain interval in milliseconds
    #[arg(long, env = "SCHEDULER_INITIAL_INTERVAL_MS", default_value_t = DEFAULT_SCHEDULER_INTERVAL_MS)]
    pub scheduler_interval_ms: u64,

    /// Drain interval in milliseconds after the upstream answers 429
    #[arg(long, env = "SCHEDULER_PENALTY_INTERVAL_MS", default_value_t = DEFAULT_SCHEDULER_PENALTY_INTERVAL_MS)]
    pub scheduler_penalty_interval_ms: u64,

    /// Period of the queue-size sampler in milliseconds
    #[arg(long, env = "QUEUE_SIZE_SAMPLE_MS", default_value_t = DEFAULT_QUEUE_SIZE_SAMPLE_MS)]
    pub queue_size_sample_ms: u64,

    /// Lifetime of cached upstream responses in seconds
    #[arg(long, env = "CACHE_TTL_SEC", default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl_secs: u64,

    /// Maximum entries held by the in-process cache (ignored with Redis)
    #[arg(long, env = "CACHE_MAX_ENTRIES", default_value_t = DEFAULT_CACHE_MAX_ENTRIES)]
    pub cache_max_entries: u64,

    /// Disable the response cache (every lookup misses, nothing is stored)
    #[arg(long, env = "DISABLE_CACHE")]
    pub disable_cache: bool,

    /// Redis connection URL. When absent, queue and cache live in process memory.
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            queue_max_size: DEFAULT_QUEUE_MAX_SIZE,
            job_ttl_ms: DEFAULT_JOB_TTL_MS,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_query_param: DEFAULT_UPSTREAM_QUERY_PARAM.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            breaker_failure_threshold: DEFAULT_BREAKER_FAILURE_THRESHOLD,
            breaker_open_window_ms: DEFAULT_BREAKER_OPEN_WINDOW_MS,
            scheduler_interval_ms: DEFAULT_SCHEDULER_INTERVAL_MS,
            scheduler_penalty_interval_ms: DEFAULT_SCHEDULER_PENALTY_INTERVAL_MS,
            queue_size_sample_ms: DEFAULT_QUEUE_SIZE_SAMPLE_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            disable_cache: false,
            redis_url: None,
        }
    }
}

impl Config {
    /// Rejects settings the proxy cannot run with.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_max_size == 0 {
            return Err(ConfigError::ZeroValue("queue_max_size"));
        }
        if self.job_ttl_ms == 0 {
            return Err(ConfigError::ZeroValue("job_ttl_ms"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue("request_timeout_ms"));
        }
        if self.breaker_failure_threshold == 0 {
            return Err(ConfigError::ZeroValue("breaker_failure_threshold"));
        }
        if self.scheduler_interval_ms == 0 {
            return Err(ConfigError::ZeroValue("scheduler_interval_ms"));
        }
        if self.queue_size_sample_ms == 0 {
            return Err(ConfigError::ZeroValue("queue_size_sample_ms"));
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::TooLarge {
                setting: "cache_ttl_secs",
                value: self.cache_ttl_secs,
                max: MAX_CACHE_TTL_SECS,
            });
        }
        if self.cache_max_entries == 0 {
            return Err(ConfigError::ZeroValue("cache_max_entries"));
        }
        if self.scheduler_penalty_interval_ms < self.scheduler_interval_ms {
            return Err(ConfigError::PenaltyFasterThanBase {
                base_ms: self.scheduler_interval_ms,
                penalty_ms: self.scheduler_penalty_interval_ms,
            });
        }
        if reqwest::Url::parse(&self.upstream_url).is_err() {
            return Err(ConfigError::InvalidUpstreamUrl(self.upstream_url.clone()));
        }
        if self.upstream_query_param.trim().is_empty() {
            return Err(ConfigError::ZeroValue("upstream_query_param"));
        }
        Ok(())
    }

    /// Upstream request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Default lifetime of an admitted job
    pub fn job_ttl(&self) -> Duration {
        Duration::from_millis(self.job_ttl_ms)
    }

    /// Lifetime of a cached upstream response
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Breaker open window
    pub fn breaker_open_window(&self) -> Duration {
        Duration::from_millis(self.breaker_open_window_ms)
    }

    /// Base drain interval
    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler_interval_ms)
    }

    /// Penalized drain interval
    pub fn scheduler_penalty_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler_penalty_interval_ms)
    }

    /// Queue-size sampler period
    pub fn queue_size_sample_interval(&self) -> Duration {
        Duration::from_millis(self.queue_size_sample_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue_max_size, 100);
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.breaker_open_window(), Duration::from_secs(10));
        assert_eq!(config.scheduler_interval(), Duration::from_secs(1));
        assert_eq!(config.scheduler_penalty_interval(), Duration::from_secs(3));
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert!(!config.disable_cache);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_defaults_match_cli_defaults() {
        let parsed = Config::try_parse_from(["score_proxy"]).expect("defaults should parse");
        let defaults = Config::default();
        assert_eq!(parsed.queue_max_size, defaults.queue_max_size);
        assert_eq!(parsed.job_ttl_ms, defaults.job_ttl_ms);
        assert_eq!(parsed.upstream_url, defaults.upstream_url);
        assert_eq!(
            parsed.breaker_failure_threshold,
            defaults.breaker_failure_threshold
        );
        assert_eq!(parsed.cache_ttl_secs, defaults.cache_ttl_secs);
    }

    #[test]
    fn test_cli_flags_override_defaults() {
        let parsed = Config::try_parse_from([
            "score_proxy",
            "--queue-max-size",
            "2",
            "--breaker-failure-threshold",
            "5",
            "--disable-cache",
            "--redis-url",
            "redis://localhost:6379",
        ])
        .expect("flags should parse");
        assert_eq!(parsed.queue_max_size, 2);
        assert_eq!(parsed.breaker_failure_threshold, 5);
        assert!(parsed.disable_cache);
        assert_eq!(parsed.redis_url.as_deref(), Some("redis://localhost:6379"));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = Config {
            queue_max_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroValue("queue_max_size"))
        ));
    }

    #[test]
    fn test_validate_rejects_penalty_faster_than_base() {
        let config = Config {
            scheduler_interval_ms: 1000,
            scheduler_penalty_interval_ms: 500,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PenaltyFasterThanBase { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_oversized_cache_ttl() {
        let config = Config {
            cache_ttl_secs: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooLarge {
                setting: "cache_ttl_secs",
                ..
            })
        ));

        let at_limit = Config {
            cache_ttl_secs: MAX_CACHE_TTL_SECS,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_cache_entries() {
        let config = Config {
            cache_max_entries: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroValue("cache_max_entries"))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_upstream_url() {
        let config = Config {
            upstream_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUpstreamUrl(_))
        ));
    }
}
