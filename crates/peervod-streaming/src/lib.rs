#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Playback-readiness core: periodic polling and the stream launch flow.
//!
//! Layout: `poller.rs` (cancellable periodic timer), `coordinator.rs`
//! (download-to-playback flow), `watcher.rs` (detail refresh loop),
//! `progress.rs` (user-facing message formatting), `config.rs` (cadence
//! settings).

/// Polling cadence configuration.
pub mod config;
/// Stream launch flow and its owning slot.
pub mod coordinator;
mod error;
/// Cancellable periodic timer primitive.
pub mod poller;
/// User-facing progress and status message formatting.
pub mod progress;
/// Detail refresh loop bound to view visibility.
pub mod watcher;

pub use config::StreamingConfig;
pub use coordinator::{PlaySlot, PlaybackSurface, StreamState, StreamingCoordinator};
pub use error::{ConfigError, PollerError, StreamError};
pub use poller::{PollHandler, Poller, Tick};
pub use watcher::{DownloadWatcher, WatchSink};
