//! Progress aggregation
//!
//! Turns the executor's counters into the single percentage and status line
//! the presentation layer shows. The first 10% of the range belongs to the
//! scan phase, the transfer phase maps onto 10..=100.

use serde::{Deserialize, Serialize};

use super::types::{TransferProgress, TransferTotals};

/// Share of the displayed range reserved for the scan phase
pub const SCAN_PHASE_PERCENT: f64 = 10.0;

/// Share of the displayed range covered by moving bytes
pub const TRANSFER_PHASE_PERCENT: f64 = 90.0;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human readable size with one decimal place, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in &SIZE_UNITS[..SIZE_UNITS.len() - 1] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} {}", size, SIZE_UNITS[SIZE_UNITS.len() - 1])
}

/// One rendered progress update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Always within `[0, 100]`
    pub percent: f64,
    pub text: String,
}

/// Percentage of a directory transfer once the scan has finished.
///
/// `10 + bytes_done / total_bytes * 90`, or a flat `90` for trees without
/// any bytes to move.
pub fn transfer_percent(progress: &TransferProgress, totals: &TransferTotals) -> f64 {
    let percent = if totals.total_bytes > 0 {
        SCAN_PHASE_PERCENT
            + (progress.bytes_done as f64 / totals.total_bytes as f64) * TRANSFER_PHASE_PERCENT
    } else {
        TRANSFER_PHASE_PERCENT
    };
    percent.clamp(0.0, 100.0)
}

/// Render the current state of a directory transfer.
pub fn format_progress(progress: &TransferProgress, totals: &TransferTotals) -> ProgressReport {
    ProgressReport {
        percent: transfer_percent(progress, totals),
        text: format!(
            "Downloading: {} / {} ({}/{} files)",
            format_size(progress.bytes_done),
            format_size(totals.total_bytes),
            progress.files_done,
            totals.total_files
        ),
    }
}

/// Status shown while the tree is still being scanned.
pub fn scanning_report(remote_dir: &str) -> ProgressReport {
    ProgressReport {
        percent: 0.0,
        text: format!("Scanning {}...", remote_dir),
    }
}

/// Progress of a single-file download.
pub fn format_file_progress(name: &str, transferred: u64, total: u64) -> ProgressReport {
    let percent = if total > 0 {
        (transferred as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    } else {
        100.0
    };
    ProgressReport {
        percent,
        text: format!(
            "Downloading {}: {} / {}",
            name,
            format_size(transferred),
            format_size(total)
        ),
    }
}
