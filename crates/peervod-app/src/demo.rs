//! Scripted end-to-end demonstration of the stream launch flow.
//!
//! Wires a scripted in-memory backend to one play request: the download is
//! admitted, progresses, switches into VOD mode, and resolves to a player
//! handoff — all narrated into the log through a logging progress surface.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::info;
use url::Url;

use peervod_downloads::{DownloadSnapshot, DownloadState, InfoHash, StubProvider};
use peervod_streaming::{
    PlaySlot, PlaybackSurface, StreamState, StreamingConfig, StreamingCoordinator,
};

use crate::bootstrap::{AppError, AppResult};

const DEMO_NAME: &str = "Big Buck Bunny";
const DEMO_HASH: &str = "dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c";
const DEMO_LOCATOR: &str = "http://127.0.0.1:8080/big_buck_bunny.mp4";

/// Progress surface that narrates the flow into the log.
struct LogSurface;

impl PlaybackSurface for LogSurface {
    fn set_message(&self, text: &str) {
        info!(message = text, "progress surface updated");
    }

    fn set_progress(&self, percent: u8) {
        info!(percent, "progress bar updated");
    }

    fn dismiss(&self) {
        info!("progress surface dismissed");
    }

    fn launch_player(&self, locator: &Url) {
        info!(%locator, "player launched");
    }
}

/// Run one scripted play request end to end and return its terminal state.
///
/// # Errors
///
/// Returns an error when the flow cannot be assembled or does not resolve
/// within a generous multiple of the poll interval.
pub async fn run_demo(config: &StreamingConfig) -> AppResult<StreamState> {
    let subject = InfoHash::new(DEMO_HASH)?;
    let provider = Arc::new(scripted_backend(&subject)?);
    let surface = Arc::new(LogSurface);

    let coordinator = StreamingCoordinator::new(
        subject,
        DEMO_NAME,
        Arc::clone(&provider) as _,
        surface as _,
        config,
    )?;

    let mut slot = PlaySlot::new();
    slot.start(coordinator, true).await?;

    let deadline = config.poll_interval() * 50;
    let pause = (config.poll_interval() / 4).max(Duration::from_millis(1));
    let state = timeout(deadline, async {
        loop {
            if let Some(state) = slot.current().map(StreamingCoordinator::state)
                && state.is_terminal()
            {
                return state;
            }
            sleep(pause).await;
        }
    })
    .await
    .map_err(|_| AppError::DemoTimedOut)?;

    slot.cancel();
    Ok(state)
}

/// Backend scripted through one full download-to-playable lifecycle.
fn scripted_backend(subject: &InfoHash) -> Result<StubProvider, url::ParseError> {
    let provider = StubProvider::new();
    provider.set_locator(Some(Url::parse(DEMO_LOCATOR)?));

    let mut queued = DownloadSnapshot::new(subject.clone(), DownloadState::Queued);
    queued.name = Some(DEMO_NAME.to_string());
    provider.push_snapshot(queued);

    for (progress, eta) in [(0.05, 240), (0.15, 180)] {
        let mut step = DownloadSnapshot::new(subject.clone(), DownloadState::Downloading);
        step.progress = progress;
        step.download_bps = 900_000;
        step.eta_seconds = Some(eta);
        provider.push_snapshot(step);
    }

    for (progress, vod_eta) in [(0.2, 40), (0.25, 25), (0.3, 10)] {
        let mut step = DownloadSnapshot::new(subject.clone(), DownloadState::VodDownloading);
        step.progress = progress;
        step.download_bps = 1_572_864;
        step.vod_eta_seconds = Some(vod_eta);
        provider.push_snapshot(step);
    }

    let mut ready = DownloadSnapshot::new(subject.clone(), DownloadState::VodDownloading);
    ready.progress = 0.35;
    ready.download_bps = 1_572_864;
    ready.vod_playable = true;
    provider.push_snapshot(ready);

    Ok(provider)
}
