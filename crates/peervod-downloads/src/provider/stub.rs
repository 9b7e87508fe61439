use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use url::Url;

use super::DownloadProvider;
use crate::error::DownloadError;
use crate::model::{DownloadSnapshot, DownloadState, InfoHash};

/// In-memory test double for the download manager contract.
///
/// Each download carries a queue of scripted snapshots; every status refresh
/// advances the queue by one and the final snapshot repeats as the steady
/// state. Requests are recorded so tests can assert how often each one was
/// issued.
#[derive(Default)]
pub struct StubProvider {
    state: Mutex<StubState>,
}

#[derive(Default)]
struct StubState {
    scripts: HashMap<InfoHash, VecDeque<DownloadSnapshot>>,
    current: Option<DownloadSnapshot>,
    locator: Option<Url>,
    download_start_calls: Vec<InfoHash>,
    vod_start_calls: Vec<InfoHash>,
    removal_calls: Vec<(InfoHash, bool)>,
}

impl StubProvider {
    /// Empty provider with no scripted downloads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the locator handed out once a download becomes playable.
    pub fn set_locator(&self, locator: Option<Url>) {
        self.lock().locator = locator;
    }

    /// Append a snapshot to its download's script.
    pub fn push_snapshot(&self, snapshot: DownloadSnapshot) {
        self.lock()
            .scripts
            .entry(snapshot.info_hash.clone())
            .or_default()
            .push_back(snapshot);
    }

    /// Overwrite the snapshot returned by the next status read, bypassing the
    /// scripts. Lets tests stage a stale answer from another download.
    pub fn set_current(&self, snapshot: Option<DownloadSnapshot>) {
        self.lock().current = snapshot;
    }

    /// How many times a download start was requested for `info_hash`.
    #[must_use]
    pub fn download_start_count(&self, info_hash: &InfoHash) -> usize {
        let state = self.lock();
        state
            .download_start_calls
            .iter()
            .filter(|hash| *hash == info_hash)
            .count()
    }

    /// How many times a VOD start was requested for `info_hash`.
    #[must_use]
    pub fn vod_start_count(&self, info_hash: &InfoHash) -> usize {
        let state = self.lock();
        state
            .vod_start_calls
            .iter()
            .filter(|hash| *hash == info_hash)
            .count()
    }

    /// Recorded removal requests, in order.
    #[must_use]
    pub fn removal_calls(&self) -> Vec<(InfoHash, bool)> {
        self.lock().removal_calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().expect("stub provider state poisoned")
    }
}

#[async_trait]
impl DownloadProvider for StubProvider {
    async fn request_download_start(
        &self,
        info_hash: &InfoHash,
        display_name: &str,
    ) -> anyhow::Result<()> {
        let mut state = self.lock();
        state.download_start_calls.push(info_hash.clone());
        state.scripts.entry(info_hash.clone()).or_insert_with(|| {
            let mut snapshot = DownloadSnapshot::new(info_hash.clone(), DownloadState::Queued);
            snapshot.name = Some(display_name.to_string());
            VecDeque::from([snapshot])
        });
        Ok(())
    }

    async fn request_status(&self, info_hash: &InfoHash) -> anyhow::Result<()> {
        let mut state = self.lock();
        let next = match state.scripts.get_mut(info_hash) {
            Some(script) if script.len() > 1 => script.pop_front(),
            Some(script) => script.front().cloned(),
            // Unknown download: the previously refreshed snapshot stays put.
            None => return Ok(()),
        };
        if next.is_some() {
            state.current = next;
        }
        Ok(())
    }

    async fn current_status(&self) -> Option<DownloadSnapshot> {
        self.lock().current.clone()
    }

    async fn request_vod_start(&self, info_hash: &InfoHash) -> anyhow::Result<()> {
        let mut state = self.lock();
        if !state.scripts.contains_key(info_hash) {
            return Err(DownloadError::NotFound {
                info_hash: info_hash.to_string(),
            }
            .into());
        }
        state.vod_start_calls.push(info_hash.clone());
        Ok(())
    }

    async fn playback_locator(&self) -> Option<Url> {
        self.lock().locator.clone()
    }

    async fn request_removal(&self, info_hash: &InfoHash, delete_data: bool) -> anyhow::Result<()> {
        let mut state = self.lock();
        if state.scripts.remove(info_hash).is_none() {
            return Err(DownloadError::NotFound {
                info_hash: info_hash.to_string(),
            }
            .into());
        }
        state.removal_calls.push((info_hash.clone(), delete_data));
        if state
            .current
            .as_ref()
            .is_some_and(|snapshot| snapshot.is_for(info_hash))
        {
            state.current = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(tail: char) -> InfoHash {
        InfoHash::new(format!("{}{}", "0".repeat(39), tail)).expect("valid hash")
    }

    fn snapshot(info_hash: &InfoHash, progress: f64) -> DownloadSnapshot {
        let mut snapshot = DownloadSnapshot::new(info_hash.clone(), DownloadState::Downloading);
        snapshot.progress = progress;
        snapshot
    }

    #[tokio::test]
    async fn scripted_snapshots_advance_and_hold_steady() {
        let provider = StubProvider::new();
        let subject = hash('a');
        provider.push_snapshot(snapshot(&subject, 0.1));
        provider.push_snapshot(snapshot(&subject, 0.5));

        provider.request_status(&subject).await.expect("refresh");
        let first = provider.current_status().await.expect("snapshot");
        assert!((first.progress - 0.1).abs() < f64::EPSILON);

        for _ in 0..3 {
            provider.request_status(&subject).await.expect("refresh");
        }
        let last = provider.current_status().await.expect("snapshot");
        assert!((last.progress - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn refresh_for_unknown_download_keeps_previous_answer() {
        let provider = StubProvider::new();
        let known = hash('a');
        let unknown = hash('b');
        provider.push_snapshot(snapshot(&known, 0.3));
        provider.request_status(&known).await.expect("refresh");

        provider.request_status(&unknown).await.expect("refresh");
        let stale = provider.current_status().await.expect("snapshot");
        assert!(stale.is_for(&known));
    }

    #[tokio::test]
    async fn download_start_records_and_seeds_a_queued_entry() {
        let provider = StubProvider::new();
        let subject = hash('c');
        provider
            .request_download_start(&subject, "Night Train")
            .await
            .expect("start");
        assert_eq!(provider.download_start_count(&subject), 1);

        provider.request_status(&subject).await.expect("refresh");
        let seeded = provider.current_status().await.expect("snapshot");
        assert_eq!(seeded.state, DownloadState::Queued);
        assert_eq!(seeded.name.as_deref(), Some("Night Train"));
    }

    #[tokio::test]
    async fn removal_requires_a_known_download() {
        let provider = StubProvider::new();
        let subject = hash('d');
        assert!(provider.request_removal(&subject, true).await.is_err());

        provider.push_snapshot(snapshot(&subject, 0.2));
        provider.request_status(&subject).await.expect("refresh");
        provider
            .request_removal(&subject, true)
            .await
            .expect("removal");
        assert_eq!(provider.removal_calls(), vec![(subject, true)]);
        assert!(provider.current_status().await.is_none());
    }
}
