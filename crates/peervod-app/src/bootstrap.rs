//! Application bootstrap and environment loading.

use peervod_downloads::DownloadError;
use peervod_streaming::{StreamError, StreamingConfig};
use peervod_telemetry::{LoggingConfig, init_logging};
use thiserror::Error;

use crate::demo;

/// Environment override for the playback-readiness poll interval.
const POLL_MS_VAR: &str = "PEERVOD_POLL_MS";

/// Primary error type for application startup.
#[derive(Debug, Error)]
pub enum AppError {
    /// Telemetry bootstrap failed.
    #[error("failed to initialise logging")]
    Logging(#[source] anyhow::Error),
    /// An environment override could not be parsed.
    #[error("invalid environment override")]
    InvalidEnv {
        /// Variable that failed to parse.
        variable: &'static str,
        /// Offending value supplied by the environment.
        value: String,
    },
    /// The streaming flow could not be assembled or started.
    #[error(transparent)]
    Stream(#[from] StreamError),
    /// A demo fixture was invalid.
    #[error(transparent)]
    Download(#[from] DownloadError),
    /// The demo locator was not a valid URL.
    #[error("invalid demo locator")]
    Locator(#[from] url::ParseError),
    /// The demo flow did not resolve in time.
    #[error("demo flow timed out")]
    DemoTimedOut,
}

/// Convenience alias for application results.
pub type AppResult<T> = Result<T, AppError>;

/// Bootstrap logging, read environment overrides, and run the demo flow.
///
/// # Errors
///
/// Returns an error when logging cannot be installed, an environment
/// override is malformed, or the demo flow fails to resolve.
pub async fn run_app() -> AppResult<()> {
    init_logging(&LoggingConfig::default()).map_err(AppError::Logging)?;
    let config = config_from_env()?;
    let state = demo::run_demo(&config).await?;
    tracing::info!(state = ?state, "demo flow resolved");
    Ok(())
}

fn config_from_env() -> AppResult<StreamingConfig> {
    let mut config = StreamingConfig::default();
    if let Ok(value) = std::env::var(POLL_MS_VAR) {
        config.poll_interval_ms = value.parse().map_err(|_| AppError::InvalidEnv {
            variable: POLL_MS_VAR,
            value,
        })?;
    }
    Ok(config)
}
