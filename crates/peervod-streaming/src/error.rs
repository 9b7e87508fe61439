//! Error types for the polling and streaming flows.

use peervod_downloads::InfoHash;
use thiserror::Error;

/// Errors raised by the periodic poller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollerError {
    /// Poll intervals must be positive durations.
    #[error("poll interval must be greater than zero")]
    InvalidInterval,
}

/// Errors raised by the stream launch flow.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The flow for this download already left its idle state.
    #[error("stream already started")]
    AlreadyStarted {
        /// Download whose flow was started twice.
        info_hash: InfoHash,
    },
    /// The underlying poller could not be armed.
    #[error("poller setup failed")]
    Poller(#[from] PollerError),
    /// The cadence configuration failed validation.
    #[error("invalid streaming configuration")]
    Config(#[from] ConfigError),
}

/// Errors raised by configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}
