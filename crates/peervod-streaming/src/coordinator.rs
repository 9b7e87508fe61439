//! Stream launch flow: make sure a download exists, switch it into VOD mode,
//! and hand the stream to the player once enough data is buffered.
//!
//! One [`StreamingCoordinator`] serves one play request. It owns a
//! [`Poller`], interprets each polled snapshot, keeps the progress surface
//! current, and resolves to exactly one terminal state: `Playable`,
//! `NoVideoFound`, or `Cancelled`. Cancellation is cooperative: an in-flight
//! tick completes, but its result is applied through a terminal-state check,
//! so a tick racing [`StreamingCoordinator::cancel`] resolves to `Cancelled`.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use peervod_downloads::{DownloadProvider, DownloadSnapshot, InfoHash};

use crate::config::StreamingConfig;
use crate::error::StreamError;
use crate::poller::{PollHandler, Poller, Tick};
use crate::progress;

/// Lifecycle of one play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No play request started yet.
    Idle,
    /// Download start requested; waiting for the backend to report it.
    EnsuringDownload,
    /// Download known to the backend; VOD mode not requested yet.
    WaitingForVodReady,
    /// VOD mode requested; waiting for a playable prefix.
    VodActive,
    /// The player has been handed the stream.
    Playable,
    /// The backend reported readiness but held no playable video file.
    NoVideoFound,
    /// The play request was cancelled before resolving.
    Cancelled,
}

impl StreamState {
    /// Whether the flow has reached a final state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Playable | Self::NoVideoFound | Self::Cancelled)
    }
}

/// Progress surface a coordinator drives while a play request is pending.
///
/// Implementations render a dialog, a notification, or a log line; the
/// coordinator only pushes text, a display percentage, and the terminal
/// player handoff.
pub trait PlaybackSurface: Send + Sync {
    /// Replace the user-visible progress message.
    fn set_message(&self, text: &str);

    /// Update the displayed completion percentage.
    fn set_progress(&self, percent: u8);

    /// Hide the progress surface after a successful handoff.
    fn dismiss(&self);

    /// Hand a ready-to-play stream locator to the external player.
    fn launch_player(&self, locator: &Url);
}

/// Drives one download from "possibly not started" to "playing".
pub struct StreamingCoordinator {
    flow: Arc<StreamFlow>,
    poller: Poller,
}

impl StreamingCoordinator {
    /// Build the flow for one play request.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Config`] when the cadence configuration is
    /// invalid.
    pub fn new(
        subject: InfoHash,
        display_name: impl Into<String>,
        provider: Arc<dyn DownloadProvider>,
        surface: Arc<dyn PlaybackSurface>,
        config: &StreamingConfig,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        let flow = Arc::new(StreamFlow {
            subject,
            display_name: display_name.into(),
            provider,
            surface,
            state: Mutex::new(StreamState::Idle),
        });
        let poller = Poller::new(config.poll_interval(), Arc::clone(&flow) as _)?;
        Ok(Self { flow, poller })
    }

    /// Start the flow.
    ///
    /// With `needs_download` the backend is asked to start the download
    /// first; a failure there is not fatal and only shows up as stalled
    /// progress on later polls. Posts the initial progress message and arms
    /// the poller, whose first firing happens one interval from now.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::AlreadyStarted`] when the flow already left
    /// [`StreamState::Idle`].
    pub async fn begin(&mut self, needs_download: bool) -> Result<(), StreamError> {
        {
            let mut state = self.flow.lock_state();
            if *state != StreamState::Idle {
                return Err(StreamError::AlreadyStarted {
                    info_hash: self.flow.subject.clone(),
                });
            }
            *state = if needs_download {
                StreamState::EnsuringDownload
            } else {
                StreamState::WaitingForVodReady
            };
        }

        if needs_download
            && let Err(err) = self
                .flow
                .provider
                .request_download_start(&self.flow.subject, &self.flow.display_name)
                .await
        {
            warn!(
                info_hash = %self.flow.subject,
                error = %err,
                "download start request failed; progress will stall until retried"
            );
        }

        self.flow.surface.set_message(progress::PREPARING_MESSAGE);
        info!(
            info_hash = %self.flow.subject,
            needs_download,
            "stream launch flow started"
        );
        self.poller.start();
        Ok(())
    }

    /// Stop polling and mark the request cancelled.
    ///
    /// Callable at any point, including while a tick is in flight; a flow
    /// that already resolved keeps its terminal state.
    pub fn cancel(&mut self) {
        self.poller.stop();
        let mut state = self.flow.lock_state();
        if !state.is_terminal() {
            *state = StreamState::Cancelled;
            info!(info_hash = %self.flow.subject, "stream launch flow cancelled");
        }
    }

    /// Current flow state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        *self.flow.lock_state()
    }

    /// Download this flow is tracking.
    #[must_use]
    pub fn subject(&self) -> &InfoHash {
        &self.flow.subject
    }

    /// Whether the poller behind this flow is still armed.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }
}

impl Drop for StreamingCoordinator {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Owner of the single active play request for one UI surface.
///
/// Starting a new request cancels whatever request the slot still holds, so
/// at most one non-terminal flow polls on behalf of the surface.
#[derive(Default)]
pub struct PlaySlot {
    active: Option<StreamingCoordinator>,
}

impl PlaySlot {
    /// Empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { active: None }
    }

    /// Cancel any held request, then begin `coordinator` and take ownership
    /// of it.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::AlreadyStarted`] when the supplied coordinator
    /// was already begun elsewhere.
    pub async fn start(
        &mut self,
        mut coordinator: StreamingCoordinator,
        needs_download: bool,
    ) -> Result<(), StreamError> {
        self.cancel();
        coordinator.begin(needs_download).await?;
        self.active = Some(coordinator);
        Ok(())
    }

    /// Cancel the held request, if any.
    pub fn cancel(&mut self) {
        if let Some(mut coordinator) = self.active.take() {
            coordinator.cancel();
        }
    }

    /// The held request, if any.
    #[must_use]
    pub fn current(&self) -> Option<&StreamingCoordinator> {
        self.active.as_ref()
    }
}

struct StreamFlow {
    subject: InfoHash,
    display_name: String,
    provider: Arc<dyn DownloadProvider>,
    surface: Arc<dyn PlaybackSurface>,
    state: Mutex<StreamState>,
}

impl StreamFlow {
    fn lock_state(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().expect("stream state mutex poisoned")
    }

    /// Apply `next` unless the flow already resolved. The guard makes a tick
    /// that raced `cancel` a no-op instead of a late overwrite.
    fn transition(&self, next: StreamState) -> bool {
        let mut state = self.lock_state();
        if state.is_terminal() {
            return false;
        }
        if *state != next {
            debug!(
                info_hash = %self.subject,
                from = ?*state,
                to = ?next,
                "stream state advanced"
            );
            *state = next;
        }
        true
    }

    async fn hand_off(&self) -> Tick {
        match self.provider.playback_locator().await {
            Some(locator) => {
                if self.transition(StreamState::Playable) {
                    self.surface.launch_player(&locator);
                    self.surface.dismiss();
                    info!(info_hash = %self.subject, %locator, "stream handed to player");
                }
            }
            None => {
                if self.transition(StreamState::NoVideoFound) {
                    // Leave the surface visible so the message can be read.
                    self.surface.set_message(progress::NO_VIDEO_MESSAGE);
                    warn!(info_hash = %self.subject, "download playable but no video file found");
                }
            }
        }
        Tick::Stop
    }

    async fn advance(&self, snapshot: &DownloadSnapshot) {
        let mut current = *self.lock_state();
        if current == StreamState::EnsuringDownload {
            // A matching snapshot means the backend has the download now.
            if !self.transition(StreamState::WaitingForVodReady) {
                return;
            }
            current = StreamState::WaitingForVodReady;
        }

        if current == StreamState::WaitingForVodReady && snapshot.state.is_transferring() {
            if let Err(err) = self.provider.request_vod_start(&self.subject).await {
                warn!(info_hash = %self.subject, error = %err, "vod start request failed");
            }
            // Entering VodActive is the once-per-flow latch for the request
            // above; later ticks observing a transferring state skip it.
            if !self.transition(StreamState::VodActive) {
                return;
            }
        }

        self.update_surface(snapshot);
    }

    fn update_surface(&self, snapshot: &DownloadSnapshot) {
        let state = *self.lock_state();
        if state.is_terminal() {
            return;
        }
        if state == StreamState::VodActive {
            self.surface.set_message(&progress::format_vod_message(
                snapshot.vod_eta_seconds,
                snapshot.download_bps,
            ));
            self.surface
                .set_progress(progress::percent_ceil(snapshot.progress));
        } else {
            self.surface.set_message(&progress::format_status_message(
                &snapshot.state,
                snapshot.progress,
            ));
        }
    }
}

#[async_trait]
impl PollHandler for StreamFlow {
    async fn on_tick(&self) -> anyhow::Result<Tick> {
        if self.lock_state().is_terminal() {
            return Ok(Tick::Stop);
        }

        // Ask for fresh data first, then read whatever the backend holds.
        if let Err(err) = self.provider.request_status(&self.subject).await {
            debug!(
                info_hash = %self.subject,
                error = %err,
                "status refresh failed; retrying on the next tick"
            );
            return Ok(Tick::Continue);
        }
        let Some(snapshot) = self.provider.current_status().await else {
            return Ok(Tick::Continue);
        };
        if !snapshot.is_for(&self.subject) {
            // Stale answer from a superseded request; never act on it.
            debug!(
                info_hash = %self.subject,
                reported = %snapshot.info_hash,
                "discarding snapshot for another download"
            );
            return Ok(Tick::Continue);
        }

        if snapshot.vod_playable {
            return Ok(self.hand_off().await);
        }
        self.advance(&snapshot).await;
        Ok(Tick::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peervod_downloads::{DownloadState, StubProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HASH_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const HASH_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[derive(Default)]
    struct RecordingSurface {
        messages: Mutex<Vec<String>>,
        percents: Mutex<Vec<u8>>,
        launches: Mutex<Vec<Url>>,
        dismissals: AtomicUsize,
    }

    impl RecordingSurface {
        fn last_message(&self) -> Option<String> {
            self.messages.lock().expect("messages").last().cloned()
        }

        fn launch_count(&self) -> usize {
            self.launches.lock().expect("launches").len()
        }

        fn dismissed(&self) -> bool {
            self.dismissals.load(Ordering::SeqCst) > 0
        }
    }

    impl PlaybackSurface for RecordingSurface {
        fn set_message(&self, text: &str) {
            self.messages.lock().expect("messages").push(text.to_string());
        }

        fn set_progress(&self, percent: u8) {
            self.percents.lock().expect("percents").push(percent);
        }

        fn dismiss(&self) {
            self.dismissals.fetch_add(1, Ordering::SeqCst);
        }

        fn launch_player(&self, locator: &Url) {
            self.launches.lock().expect("launches").push(locator.clone());
        }
    }

    struct Harness {
        provider: Arc<StubProvider>,
        surface: Arc<RecordingSurface>,
        coordinator: StreamingCoordinator,
        subject: InfoHash,
    }

    fn harness() -> Harness {
        let subject = InfoHash::new(HASH_A).expect("valid hash");
        let provider = Arc::new(StubProvider::new());
        let surface = Arc::new(RecordingSurface::default());
        let coordinator = StreamingCoordinator::new(
            subject.clone(),
            "Night Train",
            Arc::clone(&provider) as _,
            Arc::clone(&surface) as _,
            &StreamingConfig::default(),
        )
        .expect("coordinator");
        Harness {
            provider,
            surface,
            coordinator,
            subject,
        }
    }

    fn downloading(subject: &InfoHash, progress: f64) -> DownloadSnapshot {
        let mut snapshot = DownloadSnapshot::new(subject.clone(), DownloadState::Downloading);
        snapshot.progress = progress;
        snapshot.download_bps = 1_572_864;
        snapshot
    }

    fn playable(subject: &InfoHash) -> DownloadSnapshot {
        let mut snapshot = DownloadSnapshot::new(subject.clone(), DownloadState::VodDownloading);
        snapshot.progress = 0.35;
        snapshot.vod_playable = true;
        snapshot
    }

    async fn tick(harness: &Harness) -> Tick {
        harness.coordinator.flow.on_tick().await.expect("tick")
    }

    #[tokio::test]
    async fn begin_with_download_requests_it_exactly_once() {
        let mut harness = harness();
        harness.coordinator.begin(true).await.expect("begin");
        assert_eq!(harness.provider.download_start_count(&harness.subject), 1);
        assert_eq!(harness.coordinator.state(), StreamState::EnsuringDownload);
        assert_eq!(
            harness.surface.last_message().as_deref(),
            Some(progress::PREPARING_MESSAGE)
        );
        harness.coordinator.cancel();
    }

    #[tokio::test]
    async fn begin_without_download_skips_the_request() {
        let mut harness = harness();
        harness.coordinator.begin(false).await.expect("begin");
        assert_eq!(harness.provider.download_start_count(&harness.subject), 0);
        assert_eq!(harness.coordinator.state(), StreamState::WaitingForVodReady);
        harness.coordinator.cancel();
    }

    #[tokio::test]
    async fn begin_twice_is_rejected() {
        let mut harness = harness();
        harness.coordinator.begin(false).await.expect("begin");
        let err = harness.coordinator.begin(false).await.expect_err("restart");
        assert!(matches!(err, StreamError::AlreadyStarted { .. }));
        harness.coordinator.cancel();
    }

    #[tokio::test]
    async fn vod_start_is_sent_once_and_handoff_happens_on_the_playable_tick() {
        let mut harness = harness();
        let locator = Url::parse("http://127.0.0.1:8080/stream.mp4").expect("url");
        harness.provider.set_locator(Some(locator.clone()));
        for step in 0..5 {
            harness
                .provider
                .push_snapshot(downloading(&harness.subject, f64::from(step) * 0.05));
        }
        harness.provider.push_snapshot(playable(&harness.subject));
        harness.coordinator.begin(true).await.expect("begin");

        for _ in 0..5 {
            assert_eq!(tick(&harness).await, Tick::Continue);
            assert!(!harness.coordinator.state().is_terminal());
        }
        assert_eq!(harness.provider.vod_start_count(&harness.subject), 1);
        assert_eq!(harness.coordinator.state(), StreamState::VodActive);

        assert_eq!(tick(&harness).await, Tick::Stop);
        assert_eq!(harness.coordinator.state(), StreamState::Playable);
        assert_eq!(harness.surface.launch_count(), 1);
        assert_eq!(
            harness.surface.launches.lock().expect("launches")[0],
            locator
        );
        assert!(harness.surface.dismissed());
    }

    #[tokio::test]
    async fn mismatched_snapshot_changes_nothing() {
        let mut harness = harness();
        harness.coordinator.begin(false).await.expect("begin");
        let other = InfoHash::new(HASH_B).expect("valid hash");
        harness.provider.set_current(Some(playable(&other)));

        let before_state = harness.coordinator.state();
        let before_messages = harness.surface.messages.lock().expect("messages").len();
        assert_eq!(tick(&harness).await, Tick::Continue);
        assert_eq!(harness.coordinator.state(), before_state);
        assert_eq!(
            harness.surface.messages.lock().expect("messages").len(),
            before_messages
        );
        assert_eq!(harness.surface.launch_count(), 0);
        harness.coordinator.cancel();
    }

    #[tokio::test]
    async fn absent_snapshot_keeps_polling() {
        let mut harness = harness();
        harness.coordinator.begin(true).await.expect("begin");
        harness.provider.set_current(None);
        assert_eq!(tick(&harness).await, Tick::Continue);
        assert_eq!(harness.coordinator.state(), StreamState::EnsuringDownload);
        harness.coordinator.cancel();
    }

    #[tokio::test]
    async fn playable_without_a_locator_resolves_to_no_video_found() {
        let mut harness = harness();
        harness.provider.push_snapshot(playable(&harness.subject));
        harness.coordinator.begin(true).await.expect("begin");

        assert_eq!(tick(&harness).await, Tick::Stop);
        assert_eq!(harness.coordinator.state(), StreamState::NoVideoFound);
        assert_eq!(harness.surface.launch_count(), 0);
        assert!(!harness.surface.dismissed());
        assert_eq!(
            harness.surface.last_message().as_deref(),
            Some(progress::NO_VIDEO_MESSAGE)
        );

        // Resolved flows stop making provider calls on later ticks.
        assert_eq!(tick(&harness).await, Tick::Stop);
        assert_eq!(harness.provider.vod_start_count(&harness.subject), 0);
    }

    #[tokio::test]
    async fn cancel_racing_a_tick_resolves_to_cancelled() {
        let mut harness = harness();
        harness.provider.push_snapshot(playable(&harness.subject));
        let locator = Url::parse("http://127.0.0.1:8080/stream.mp4").expect("url");
        harness.provider.set_locator(Some(locator));
        harness.coordinator.begin(true).await.expect("begin");

        // Cancel lands while the snapshot is already staged; the next tick
        // must discard its own result instead of overwriting the cancel.
        harness.coordinator.cancel();
        assert_eq!(tick(&harness).await, Tick::Stop);
        assert_eq!(harness.coordinator.state(), StreamState::Cancelled);
        assert_eq!(harness.surface.launch_count(), 0);
    }

    #[tokio::test]
    async fn vod_mode_messages_show_eta_and_rate() {
        let mut harness = harness();
        let mut vod = downloading(&harness.subject, 0.301);
        vod.state = DownloadState::VodDownloading;
        vod.vod_eta_seconds = Some(90);
        harness.provider.push_snapshot(vod);
        harness.coordinator.begin(false).await.expect("begin");

        assert_eq!(tick(&harness).await, Tick::Continue);
        assert_eq!(harness.coordinator.state(), StreamState::VodActive);
        assert_eq!(
            harness.surface.last_message().as_deref(),
            Some("Video starts playing in about 1m 30s (1.50 MiB/s).")
        );
        assert_eq!(
            harness.surface.percents.lock().expect("percents").last(),
            Some(&31)
        );
        harness.coordinator.cancel();
    }

    #[tokio::test]
    async fn queued_snapshots_show_the_generic_status_line() {
        let mut harness = harness();
        let queued = DownloadSnapshot::new(harness.subject.clone(), DownloadState::Queued);
        harness.provider.push_snapshot(queued);
        harness.coordinator.begin(true).await.expect("begin");

        assert_eq!(tick(&harness).await, Tick::Continue);
        assert_eq!(harness.coordinator.state(), StreamState::WaitingForVodReady);
        assert_eq!(harness.provider.vod_start_count(&harness.subject), 0);
        assert_eq!(
            harness.surface.last_message().as_deref(),
            Some("Download status: queued")
        );
        harness.coordinator.cancel();
    }

    #[tokio::test]
    async fn play_slot_replaces_and_cancels_the_previous_request() {
        let first = harness();
        let second = harness();
        let mut slot = PlaySlot::new();
        slot.start(first.coordinator, false).await.expect("start");
        assert_eq!(
            slot.current().map(StreamingCoordinator::state),
            Some(StreamState::WaitingForVodReady)
        );

        slot.start(second.coordinator, false).await.expect("start");
        assert_eq!(
            slot.current().map(StreamingCoordinator::state),
            Some(StreamState::WaitingForVodReady)
        );
        slot.cancel();
        assert!(slot.current().is_none());
    }
}
