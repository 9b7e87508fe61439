//! Contract to the remote download manager.

use async_trait::async_trait;
use url::Url;

use crate::model::{DownloadSnapshot, InfoHash};

mod stub;

pub use stub::StubProvider;

/// Remote download manager as seen by polling consumers.
///
/// The request methods are fire-and-forget: they ask the backend to do
/// something and return once the request is on its way. Results surface on a
/// later poll through [`DownloadProvider::current_status`], which returns the
/// most recently refreshed snapshot tagged with the download it belongs to.
/// Consumers must compare that tag against the download they are tracking and
/// discard mismatched answers; with several consumers polling concurrently, a
/// stale answer from a superseded request is expected traffic, not an error.
#[async_trait]
pub trait DownloadProvider: Send + Sync {
    /// Ask the backend to start downloading the given content.
    async fn request_download_start(
        &self,
        info_hash: &InfoHash,
        display_name: &str,
    ) -> anyhow::Result<()>;

    /// Ask the backend to refresh its status for the given download.
    async fn request_status(&self, info_hash: &InfoHash) -> anyhow::Result<()>;

    /// Most recently refreshed snapshot, if the backend holds one.
    async fn current_status(&self) -> Option<DownloadSnapshot>;

    /// Ask the backend to switch the download into VOD (playback-order) mode.
    async fn request_vod_start(&self, info_hash: &InfoHash) -> anyhow::Result<()>;

    /// Stream locator for the download most recently made playable.
    async fn playback_locator(&self) -> Option<Url>;

    /// Ask the backend to remove a download, optionally deleting its data.
    async fn request_removal(&self, info_hash: &InfoHash, delete_data: bool) -> anyhow::Result<()>;
}
