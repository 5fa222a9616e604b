//! Logging setup for the store and its producers
//!
//! Store operations emit `tracing` events: `trace` per record, `debug` per
//! chunk allocation, `info` per plot pass, `warn` for geometry anomalies and
//! `error` for allocation failures and corruption.
//!
//! ```rust,no_run
//! use plotstore::core::logging::init_logging;
//!
//! init_logging(Some("debug"), Some("pretty")).unwrap();
//! ```
//!
//! # Environment Variables
//!
//! - `PLOTSTORE_LOG_LEVEL`: level or filter directive (`warn`, `plotstore::store=trace`)
//! - `RUST_LOG`: used when `PLOTSTORE_LOG_LEVEL` is unset
//! - `PLOTSTORE_LOG_FORMAT`: `compact`, `pretty` or `json`
//!
//! ```bash
//! # Watch chunk allocation while running a producer
//! PLOTSTORE_LOG_LEVEL="info,plotstore::store::manager=debug" plotstore run trace.log
//! ```

use std::str::FromStr;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Environment variable holding the log level or filter directive
pub const LOG_LEVEL_ENV: &str = "PLOTSTORE_LOG_LEVEL";

/// Environment variable holding the log format
pub const LOG_FORMAT_ENV: &str = "PLOTSTORE_LOG_FORMAT";

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact single-line format
    Compact,
    /// Pretty multi-line format with colors
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Resolved logging settings after applying argument and environment fallbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directive: String,
    pub format: LogFormat,
}

impl LogSettings {
    /// Resolve settings from explicit arguments, then the environment, then defaults
    pub fn resolve(level: Option<&str>, format: Option<&str>) -> Result<Self, String> {
        let directive = level
            .map(str::to_string)
            .or_else(|| std::env::var(LOG_LEVEL_ENV).ok())
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string());

        let format = format
            .map(str::to_string)
            .or_else(|| std::env::var(LOG_FORMAT_ENV).ok())
            .unwrap_or_else(|| "compact".to_string());

        let format = LogFormat::from_str(&format)?;
        Ok(Self { directive, format })
    }

    fn filter(&self) -> EnvFilter {
        if self.directive == "off" {
            return EnvFilter::new("off");
        }
        EnvFilter::try_new(&self.directive).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize the global tracing subscriber
///
/// * `level` - level or filter directive; falls back to `PLOTSTORE_LOG_LEVEL`,
///   then `RUST_LOG`, then `info`.
/// * `format` - `compact`, `pretty` or `json`; falls back to
///   `PLOTSTORE_LOG_FORMAT`, then `compact`.
///
/// Events go to stderr. Fails if the format is unknown or a global
/// subscriber is already set.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings =
        LogSettings::resolve(level, format).map_err(|e| format!("Invalid log format: {}", e))?;
    let filter = settings.filter();

    match settings.format {
        LogFormat::Compact => {
            Registry::default()
                .with(filter)
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_level(true)
                        .with_span_events(FmtSpan::NONE),
                )
                .try_init()?;
        }
        LogFormat::Pretty => {
            Registry::default()
                .with(filter)
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_span_events(FmtSpan::ACTIVE)
                        .pretty(),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            Registry::default()
                .with(filter)
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .json(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Initialize logging with default settings (info level, compact format)
pub fn init_default_logging() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("compact").unwrap(), LogFormat::Compact);
        assert_eq!(LogFormat::from_str("Pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_log_format_variants() {
        let variants = LogFormat::variants();
        assert_eq!(variants.len(), 3);
        assert!(variants.contains(&"json"));
    }

    #[test]
    fn test_explicit_arguments_win() {
        let settings = LogSettings::resolve(Some("trace"), Some("json")).unwrap();
        assert_eq!(settings.directive, "trace");
        assert_eq!(settings.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(LogSettings::resolve(Some("info"), Some("yaml")).is_err());
    }
}
