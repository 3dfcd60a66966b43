//! Tree scanner
//!
//! Walks a remote directory depth-first to compute the totals a directory
//! download reports progress against. Unreadable sub-directories are logged
//! and counted as empty, so a scan always produces a (best-effort) result.

use tracing::{debug, info, warn};

use super::path_utils::{is_plain_entry_name, join_remote_path};
use super::remote::RemoteFs;
use super::types::TransferTotals;

/// A file discovered during the scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScannedFile {
    pub path: String,
    pub size: u64,
}

/// Full outcome of a scan
#[derive(Debug, Default)]
pub(crate) struct ScanReport {
    pub totals: TransferTotals,
    /// Files in discovery order
    pub files: Vec<ScannedFile>,
    /// Directories whose listing failed
    pub skipped_dirs: Vec<String>,
}

/// Compute file and byte totals of a remote directory tree.
pub async fn scan(remote: &dyn RemoteFs, remote_dir: &str) -> TransferTotals {
    scan_tree(remote, remote_dir).await.totals
}

pub(crate) async fn scan_tree(remote: &dyn RemoteFs, remote_dir: &str) -> ScanReport {
    let mut report = ScanReport::default();
    scan_dir(remote, remote_dir, &mut report).await;

    info!(
        "Scanned {}: {} files, {} bytes, {} unreadable directories",
        remote_dir,
        report.totals.total_files,
        report.totals.total_bytes,
        report.skipped_dirs.len()
    );
    report
}

async fn scan_dir(remote: &dyn RemoteFs, dir: &str, report: &mut ScanReport) {
    let entries = match remote.list_entries(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Skipping {} during scan: {}", dir, e);
            report.skipped_dirs.push(dir.to_string());
            return;
        }
    };

    for entry in entries {
        let path = join_remote_path(dir, &entry.name);
        // Not counted; the executor skips these as well
        if !is_plain_entry_name(&entry.name) {
            warn!("Skipping {:?} in {} during scan: not a plain file name", entry.name, dir);
            if entry.is_dir() {
                report.skipped_dirs.push(path);
            }
            continue;
        }
        if entry.is_dir() {
            // Boxed to avoid infinite future size
            Box::pin(scan_dir(remote, &path, report)).await;
        } else {
            debug!("Scan found {} ({} bytes)", path, entry.size);
            report.totals.total_files += 1;
            report.totals.total_bytes += entry.size;
            report.files.push(ScannedFile {
                path,
                size: entry.size,
            });
        }
    }
}
