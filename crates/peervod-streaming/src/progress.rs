//! User-facing progress and status message formatting.
//!
//! Percentages here are shaped for display only; playback readiness is
//! decided by the backend's playable flag, never by these numbers.

use peervod_downloads::{DownloadSnapshot, DownloadState};

/// Message shown when a playable download turns out to hold no video file.
pub const NO_VIDEO_MESSAGE: &str = "No video file could be found in the torrent";

/// Initial message shown while the first poll is still in flight.
pub const PREPARING_MESSAGE: &str = "Preparing stream...";

/// Completion percentage rounded to the nearest whole number, for status text.
#[must_use]
pub fn percent_rounded(progress: f64) -> u8 {
    to_percent(progress, f64::round)
}

/// Completion percentage rounded up, for progress bars that should never
/// appear to move backwards past a shown value.
#[must_use]
pub fn percent_ceil(progress: f64) -> u8 {
    to_percent(progress, f64::ceil)
}

fn to_percent(progress: f64, shape: fn(f64) -> f64) -> u8 {
    let scaled = shape(progress.clamp(0.0, 1.0) * 100.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        scaled as u8
    }
}

/// Transfer rate with a binary unit ladder, e.g. `1.50 MiB/s`.
#[must_use]
pub fn format_rate(bps: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    #[allow(clippy::cast_precision_loss)]
    let value = bps as f64;
    if value >= GIB {
        format!("{:.2} GiB/s", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB/s", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB/s", value / KIB)
    } else {
        format!("{bps} B/s")
    }
}

/// Compact duration, e.g. `45s`, `1m 30s`, `2h 5m`.
#[must_use]
pub fn format_eta(seconds: u64) -> String {
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Message shown while waiting for the stream to become playable.
#[must_use]
pub fn format_vod_message(vod_eta_seconds: Option<u64>, download_bps: u64) -> String {
    vod_eta_seconds.map_or_else(
        || {
            format!(
                "Video starts playing in a moment ({}).",
                format_rate(download_bps)
            )
        },
        |eta| {
            format!(
                "Video starts playing in about {} ({}).",
                format_eta(eta),
                format_rate(download_bps)
            )
        },
    )
}

/// Generic status line; the percentage is appended only while the backend is
/// actively fetching data.
#[must_use]
pub fn format_status_message(state: &DownloadState, progress: f64) -> String {
    if state.is_transferring() {
        format!(
            "Download status: {} ({}%)",
            state.label(),
            percent_rounded(progress)
        )
    } else {
        format!("Download status: {}", state.label())
    }
}

/// ETA line for a detail view; only meaningful while streaming in playback
/// order, `Unknown` otherwise.
#[must_use]
pub fn format_detail_eta(snapshot: &DownloadSnapshot) -> String {
    match (&snapshot.state, snapshot.eta_seconds) {
        (DownloadState::VodDownloading, Some(eta)) => format_eta(eta),
        _ => "Unknown".to_string(),
    }
}
