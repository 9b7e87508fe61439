//! Error types for the download domain.

use thiserror::Error;

/// Primary error type for download domain operations.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Info hash was not a 40 character hex string.
    #[error("invalid info hash")]
    InvalidInfoHash {
        /// Offending value supplied by the caller.
        value: String,
    },
    /// Download was not known to the provider.
    #[error("download not found")]
    NotFound {
        /// Missing download identifier.
        info_hash: String,
    },
}

/// Convenience alias for download domain results.
pub type DownloadResult<T> = Result<T, DownloadError>;
