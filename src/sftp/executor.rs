//! Transfer executor
//!
//! Mirrors a remote directory into a local one, one file at a time, and
//! reports progress against the totals computed by the scanner.
//!
//! Remote failures (an unreadable directory, a file that cannot be fetched)
//! are logged and skipped. Local failures (cannot create a directory or open
//! a destination file) abort the whole operation.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::error::SftpError;
use super::path_utils::{is_plain_entry_name, join_remote_path};
use super::progress::{format_progress, ProgressReport};
use super::remote::RemoteFs;
use super::types::{TransferProgress, TransferTotals};

/// Outcome of a completed directory mirror
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub progress: TransferProgress,
    /// Remote files that could not be fetched
    pub skipped_files: Vec<String>,
    /// Remote directories that could not be listed
    pub skipped_dirs: Vec<String>,
}

impl TransferSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_files.len() + self.skipped_dirs.len()
    }
}

/// State threaded through the recursive walk of one operation
struct TransferContext<'a> {
    totals: TransferTotals,
    summary: TransferSummary,
    on_progress: &'a mut (dyn FnMut(ProgressReport) + Send),
}

impl TransferContext<'_> {
    fn file_completed(&mut self, path: &str, size: u64) {
        self.summary.progress.complete_file(size);
        debug!(
            "Completed {} ({}/{} files)",
            path, self.summary.progress.files_done, self.totals.total_files
        );
        (self.on_progress)(format_progress(&self.summary.progress, &self.totals));
    }
}

/// Mirror `remote_dir` into `local_dir`.
///
/// `on_progress` is called once before the first file and after every
/// completed file; percentages never decrease.
pub async fn transfer_directory(
    remote: &dyn RemoteFs,
    remote_dir: &str,
    local_dir: &Path,
    totals: TransferTotals,
    on_progress: &mut (dyn FnMut(ProgressReport) + Send),
) -> Result<TransferSummary, SftpError> {
    info!(
        "Mirroring {} into {} ({} files, {} bytes)",
        remote_dir,
        local_dir.display(),
        totals.total_files,
        totals.total_bytes
    );

    let mut ctx = TransferContext {
        totals,
        summary: TransferSummary::default(),
        on_progress,
    };
    (ctx.on_progress)(format_progress(&ctx.summary.progress, &ctx.totals));

    ensure_local_dir(local_dir).await?;
    transfer_dir_inner(remote, remote_dir, local_dir, &mut ctx).await?;

    if ctx.summary.skipped() > 0 {
        warn!(
            "Mirror of {} finished with {} skipped entries",
            remote_dir,
            ctx.summary.skipped()
        );
    }
    Ok(ctx.summary)
}

async fn ensure_local_dir(path: &Path) -> Result<(), SftpError> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        error!("Cannot create local directory {}: {}", path.display(), e);
        SftpError::local_io(path, e)
    })
}

async fn transfer_dir_inner(
    remote: &dyn RemoteFs,
    remote_dir: &str,
    local_dir: &Path,
    ctx: &mut TransferContext<'_>,
) -> Result<(), SftpError> {
    let entries = match remote.list_entries(remote_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Skipping directory {}: {}", remote_dir, e);
            ctx.summary.skipped_dirs.push(remote_dir.to_string());
            return Ok(());
        }
    };

    for entry in entries {
        let remote_path = join_remote_path(remote_dir, &entry.name);
        if !is_plain_entry_name(&entry.name) {
            warn!("Skipping {:?} in {}: not a plain file name", entry.name, remote_dir);
            if entry.is_dir() {
                ctx.summary.skipped_dirs.push(remote_path);
            } else {
                ctx.summary.skipped_files.push(remote_path);
            }
            continue;
        }
        let local_path: PathBuf = local_dir.join(&entry.name);

        if entry.is_dir() {
            ensure_local_dir(&local_path).await?;
            // Boxed to avoid infinite future size
            Box::pin(transfer_dir_inner(remote, &remote_path, &local_path, ctx)).await?;
            continue;
        }

        // A file is done once its fetch returns; it then counts with its listed size
        let result = remote
            .fetch_file(&remote_path, &local_path, &mut |_, _| {})
            .await;

        match result {
            Ok(bytes) => {
                if bytes != entry.size {
                    debug!(
                        "{} fetched {} bytes, listed size was {}",
                        remote_path, bytes, entry.size
                    );
                }
                ctx.file_completed(&remote_path, entry.size);
            }
            Err(e) if e.is_local() => {
                error!("Aborting mirror of {}: {}", remote_dir, e);
                return Err(e);
            }
            Err(e) => {
                warn!("Skipping file {}: {}", remote_path, e);
                ctx.summary.skipped_files.push(remote_path);
            }
        }
    }

    Ok(())
}
