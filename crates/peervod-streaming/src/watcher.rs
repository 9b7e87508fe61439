//! Detail refresh loop: keeps one download's detail view current while it is
//! visible.
//!
//! The watcher shares the poll shape of the launch flow (refresh request,
//! read back, discard mismatched answers) but never mutates backend state; it
//! only forwards matching snapshots to its sink. Its lifecycle is meant to
//! track view visibility: `start` on show or resume, `stop` on hide.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use peervod_downloads::{DownloadProvider, DownloadSnapshot, InfoHash};

use crate::config::StreamingConfig;
use crate::error::StreamError;
use crate::poller::{PollHandler, Poller, Tick};

/// Receiver for the snapshots a [`DownloadWatcher`] observes.
pub trait WatchSink: Send + Sync {
    /// Called with the latest snapshot of the watched download.
    fn snapshot_updated(&self, snapshot: &DownloadSnapshot);
}

/// Periodically refreshes one download and forwards its snapshots.
pub struct DownloadWatcher {
    poller: Poller,
}

impl DownloadWatcher {
    /// Build a watcher for one download.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Config`] when the cadence configuration is
    /// invalid.
    pub fn new(
        subject: InfoHash,
        provider: Arc<dyn DownloadProvider>,
        sink: Arc<dyn WatchSink>,
        config: &StreamingConfig,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        let refresh = Arc::new(WatchLoop {
            subject,
            provider,
            sink,
        });
        let poller = Poller::new(config.detail_interval(), refresh as _)?;
        Ok(Self { poller })
    }

    /// Start or re-arm the refresh loop; call whenever the view becomes
    /// visible again.
    pub fn start(&mut self) {
        self.poller.start();
    }

    /// Stop refreshing; call whenever the view is hidden.
    pub fn stop(&mut self) {
        self.poller.stop();
    }

    /// Whether the refresh loop is currently armed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.poller.is_running()
    }
}

struct WatchLoop {
    subject: InfoHash,
    provider: Arc<dyn DownloadProvider>,
    sink: Arc<dyn WatchSink>,
}

#[async_trait]
impl PollHandler for WatchLoop {
    async fn on_tick(&self) -> anyhow::Result<Tick> {
        if let Err(err) = self.provider.request_status(&self.subject).await {
            debug!(
                info_hash = %self.subject,
                error = %err,
                "detail refresh failed; retrying on the next tick"
            );
            return Ok(Tick::Continue);
        }
        if let Some(snapshot) = self.provider.current_status().await
            && snapshot.is_for(&self.subject)
        {
            self.sink.snapshot_updated(&snapshot);
        }
        Ok(Tick::Continue)
    }
}
