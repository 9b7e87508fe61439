//! Telemetry primitives shared across the peervod workspace.
//!
//! Centralises the tracing subscriber setup so every binary adopts the same
//! logging story: `RUST_LOG` overrides, JSON output for release builds, and
//! a pretty formatter for local development.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

/// Default logging target when `RUST_LOG` is not provided.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the tracing subscriber cannot be installed (for
/// example, because another subscriber has already been set globally).
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level));

    let builder = fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false);

    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    }
    .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

    tracing::debug!(level = config.level, format = ?config.format, "logging installed");
    Ok(())
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Default filter directive when `RUST_LOG` is absent.
    pub level: &'a str,
    /// Output format for the installed subscriber.
    pub format: LogFormat,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON lines, one event per line.
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_reports_an_error() {
        let config = LoggingConfig {
            level: "debug",
            format: LogFormat::Pretty,
        };
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_err());
    }
}
