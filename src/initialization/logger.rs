//! Logger initialization.

use std::io::Write;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;
use colored::*;
use log::LevelFilter;

/// Initializes the logger with the specified level and format.
///
/// Configures `env_logger` with either a colored single-line format for
/// terminals or one JSON object per line for log collectors.
///
/// `RUST_LOG` is read first; the provided `level` then overrides the global
/// and `score_proxy` filters, so `RUST_LOG` remains useful for per-module
/// tuning of dependencies. HTTP and Redis client internals are capped at Info.
///
/// # Arguments
///
/// * `level` - Minimum log level for the proxy's own messages
/// * `format` - Log format (Plain or Json)
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// # Quieter Redis client, debug for the proxy
/// RUST_LOG=redis=warn score_proxy --log-level debug
///
/// # JSON lines for a collector
/// LOG_FORMAT=json score_proxy
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("hyper_util", LevelFilter::Info);
    builder.filter_module("redis", LevelFilter::Info);
    builder.filter_module("score_proxy", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                let msg = serde_json::to_string(&record.args().to_string())
                    .unwrap_or_else(|_| "\"\"".into());
                writeln!(
                    buf,
                    "{{\"ts\":\"{}\",\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                    record.level(),
                    record.target(),
                    msg
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let level = record.level();
                let colored_level = match level {
                    log::Level::Error => level.to_string().red().bold(),
                    log::Level::Warn => level.to_string().yellow(),
                    log::Level::Info => level.to_string().green(),
                    log::Level::Debug => level.to_string().blue(),
                    log::Level::Trace => level.to_string().purple(),
                };

                writeln!(
                    buf,
                    "{} {:>5} {} {}",
                    chrono::Local::now().format("%H:%M:%S%.3f").to_string().dimmed(),
                    colored_level,
                    record.target().cyan(),
                    record.args()
                )
            });
        }
    }

    // try_init so a second call (tests, embedding) reports instead of panicking
    builder.try_init().map_err(InitializationError::from)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // env_logger can only be installed once per process, so these only check
    // that initialization never panics.

    #[test]
    fn test_init_logger_plain_format() {
        let result = init_logger_with(LevelFilter::Info, LogFormat::Plain);
        assert!(result.is_ok() || result.is_err());
    }

    #[test]
    fn test_init_logger_json_format() {
        let result = init_logger_with(LevelFilter::Debug, LogFormat::Json);
        assert!(result.is_ok() || result.is_err());
    }

    #[test]
    fn test_second_init_reports_error() {
        let _ = init_logger_with(LevelFilter::Info, LogFormat::Plain);
        let result = init_logger_with(LevelFilter::Warn, LogFormat::Plain);
        assert!(matches!(result, Err(InitializationError::LoggerError(_))));
    }
}
