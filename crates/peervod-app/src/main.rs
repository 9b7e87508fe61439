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

//! Binary entrypoint that wires telemetry and runs the demo stream flow.

use peervod_app::{AppResult, run_app};

/// Bootstraps the peervod demo harness and blocks until it resolves.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
