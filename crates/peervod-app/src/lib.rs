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
#![allow(clippy::multiple_crate_versions)]

//! Peervod application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (logging and environment wiring), `demo.rs`
//! (scripted end-to-end run of the stream launch flow).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Scripted end-to-end demonstration flow.
pub mod demo;

pub use bootstrap::{AppError, AppResult, run_app};
