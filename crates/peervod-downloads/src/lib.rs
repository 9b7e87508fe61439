//! Backend-agnostic download interfaces and DTOs for the peervod workspace.
//!
//! The [`DownloadProvider`] trait models the remote download manager the
//! mobile surfaces talk to: fire-and-forget requests, with results read back
//! on a later poll as subject-tagged [`DownloadSnapshot`]s. A scripted
//! [`StubProvider`] double backs tests and the demo harness.

mod error;
pub mod model;
pub mod provider;

pub use error::{DownloadError, DownloadResult};
pub use model::{DownloadSnapshot, DownloadState, InfoHash};
pub use provider::{DownloadProvider, StubProvider};
