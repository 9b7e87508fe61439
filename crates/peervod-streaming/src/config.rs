//! Cadence settings for the streaming flows.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Interval between playback-readiness polls.
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
/// Interval between detail view refreshes.
const DEFAULT_DETAIL_INTERVAL_MS: u64 = 2_000;

/// Polling cadence for the stream launch flow and the detail watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Milliseconds between playback-readiness polls.
    pub poll_interval_ms: u64,
    /// Milliseconds between detail view refreshes.
    pub detail_interval_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            detail_interval_ms: DEFAULT_DETAIL_INTERVAL_MS,
        }
    }
}

impl StreamingConfig {
    /// Check that every cadence is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when an interval is zero.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidField {
                field: "poll_interval_ms",
                reason: "must be greater than zero",
            });
        }
        if self.detail_interval_ms == 0 {
            return Err(ConfigError::InvalidField {
                field: "detail_interval_ms",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    /// Playback-readiness poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Detail refresh interval as a [`Duration`].
    #[must_use]
    pub const fn detail_interval(&self) -> Duration {
        Duration::from_millis(self.detail_interval_ms)
    }
}
