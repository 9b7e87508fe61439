//! Core download domain types shared across the workspace.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DownloadError, DownloadResult};

/// Length of a hex-encoded SHA-1 info hash.
const INFO_HASH_LEN: usize = 40;

/// Identifier of a download, the hex-encoded info hash of its torrent.
///
/// Normalised to lowercase on construction; immutable for the lifetime of a
/// poll cycle, so consumers can use it to discard answers that belong to a
/// different download.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InfoHash(String);

impl InfoHash {
    /// Parse and normalise an info hash.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidInfoHash`] unless the value is exactly
    /// 40 hex characters.
    pub fn new(value: impl Into<String>) -> DownloadResult<Self> {
        let value = value.into();
        if value.len() != INFO_HASH_LEN || !value.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(DownloadError::InvalidInfoHash { value });
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// View the hash as its lowercase hex form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InfoHash {
    type Err = DownloadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl TryFrom<String> for InfoHash {
    type Error = DownloadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InfoHash> for String {
    fn from(value: InfoHash) -> Self {
        value.0
    }
}

/// Lifecycle states reported by the download backend.
///
/// The backend owns the full set; consumers should treat unrecognised values
/// as [`DownloadState::Unknown`] and only branch on the states they care
/// about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// State not reported or not recognised.
    Unknown,
    /// Admitted but not transferring yet.
    Queued,
    /// Fetching pieces in rarest-first order.
    Downloading,
    /// Fetching pieces in playback order.
    VodDownloading,
    /// Complete and uploading to peers.
    Seeding,
    /// Halted by the user or the backend.
    Stopped,
    /// Backend reported a failure.
    Failed {
        /// Human-readable failure description.
        message: String,
    },
}

impl DownloadState {
    /// Short human-readable label for status lines.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::VodDownloading => "streaming",
            Self::Seeding => "seeding",
            Self::Stopped => "stopped",
            Self::Failed { .. } => "failed",
        }
    }

    /// Whether the backend is actively fetching data in this state.
    #[must_use]
    pub const fn is_transferring(&self) -> bool {
        matches!(self, Self::Downloading | Self::VodDownloading)
    }
}

/// Point-in-time view of a download, tagged with the download it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSnapshot {
    /// Download the snapshot belongs to.
    pub info_hash: InfoHash,
    /// Display name when the backend knows one.
    pub name: Option<String>,
    /// Lifecycle state at capture time.
    pub state: DownloadState,
    /// Completion fraction in `0.0..=1.0`.
    pub progress: f64,
    /// Current download rate in bytes per second.
    pub download_bps: u64,
    /// Current upload rate in bytes per second.
    pub upload_bps: u64,
    /// Estimated seconds until completion, meaningful only while transferring.
    pub eta_seconds: Option<u64>,
    /// Estimated seconds until playback can start, meaningful only in VOD mode.
    pub vod_eta_seconds: Option<u64>,
    /// Whether enough of the target file is buffered to begin playback.
    pub vod_playable: bool,
    /// Swarm availability when the backend reports one.
    pub availability: Option<u32>,
    /// Capture timestamp.
    pub last_updated: DateTime<Utc>,
}

impl DownloadSnapshot {
    /// Minimal snapshot for the given download, captured now.
    #[must_use]
    pub fn new(info_hash: InfoHash, state: DownloadState) -> Self {
        Self {
            info_hash,
            name: None,
            state,
            progress: 0.0,
            download_bps: 0,
            upload_bps: 0,
            eta_seconds: None,
            vod_eta_seconds: None,
            vod_playable: false,
            availability: None,
            last_updated: Utc::now(),
        }
    }

    /// Whether the snapshot belongs to `subject`.
    #[must_use]
    pub fn is_for(&self, subject: &InfoHash) -> bool {
        self.info_hash == *subject
    }

    /// Completion percentage (0-100) without display rounding.
    #[must_use]
    pub fn percent_complete(&self) -> f64 {
        self.progress.clamp(0.0, 1.0) * 100.0
    }
}
