//! Transfer worker
//!
//! Implements the "single owner" pattern for the remote session: one task
//! owns the [`RemoteFs`] and executes commands from an mpsc queue strictly one
//! at a time. The session protocol is not safe for concurrent use, so a
//! second request while one is running simply waits its turn (or is rejected
//! through the `try_*` variants).
//!
//! Results of downloads flow back as [`TransferEvent`]s on an unbounded
//! channel, to be drained by the interactive thread. For every operation the
//! terminal event (`Completed` or `Failed`) is the last one and is sent once.
//!
//! # Usage
//!
//! ```ignore
//! let (controller, mut events) = TransferWorker::spawn(Arc::new(session));
//!
//! let entries = controller.list_entries("/srv").await?;
//! let op = controller.download_directory("/srv/logs", "/tmp").await?;
//!
//! while let Some(event) = events.recv().await {
//!     browser.apply(&event);
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::SftpError;
use super::executor::transfer_directory;
use super::ledger::LedgerEntry;
use super::path_utils::{normalize_remote_path, remote_file_name};
use super::progress::{format_file_progress, format_size, scanning_report, ProgressReport};
use super::remote::RemoteFs;
use super::scanner::scan;
use super::types::RemoteEntry;

/// Local folder name used when the remote root itself is downloaded
pub const ROOT_DIRECTORY_NAME: &str = "SFTP_Root";

/// Queue depth of the command channel
const COMMAND_QUEUE_SIZE: usize = 64;

/// Notification about one download operation
#[derive(Debug, Clone, Serialize)]
pub struct TransferEvent {
    pub operation: Uuid,
    pub kind: TransferEventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferEventKind {
    Progress { percent: f64, text: String },
    Completed { entry: LedgerEntry },
    Failed { message: String },
}

impl TransferEventKind {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferEventKind::Progress { .. })
    }
}

impl From<ProgressReport> for TransferEventKind {
    fn from(report: ProgressReport) -> Self {
        TransferEventKind::Progress {
            percent: report.percent,
            text: report.text,
        }
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<TransferEvent>;

/// Commands sent to the worker task
enum WorkerCommand {
    List {
        path: String,
        reply_tx: oneshot::Sender<Result<Vec<RemoteEntry>, SftpError>>,
    },
    Stat {
        path: String,
        reply_tx: oneshot::Sender<Result<RemoteEntry, SftpError>>,
    },
    DownloadFile {
        operation: Uuid,
        remote_path: String,
        local_path: PathBuf,
    },
    DownloadDirectory {
        operation: Uuid,
        remote_dir: String,
        local_parent: PathBuf,
    },
    Close {
        reply_tx: oneshot::Sender<Result<(), SftpError>>,
    },
}

/// Local directory a remote directory is mirrored into
pub fn directory_download_target(local_parent: &Path, remote_dir: &str) -> PathBuf {
    let name = remote_file_name(remote_dir).unwrap_or_else(|| ROOT_DIRECTORY_NAME.to_string());
    local_parent.join(name)
}

/// Handle for submitting work to the worker task
///
/// Cheap to clone; every clone feeds the same queue.
#[derive(Clone)]
pub struct TransferController {
    cmd_tx: mpsc::Sender<WorkerCommand>,
    /// Commands submitted and not yet finished
    pending: Arc<AtomicUsize>,
}

impl TransferController {
    async fn submit(&self, cmd: WorkerCommand) -> Result<(), SftpError> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.cmd_tx.send(cmd).await.is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(SftpError::WorkerClosed);
        }
        Ok(())
    }

    /// Whether a command is running or queued
    pub fn is_busy(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    pub fn is_running(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    pub async fn list_entries(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(WorkerCommand::List {
            path: normalize_remote_path(path, [""; 0]),
            reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| SftpError::WorkerClosed)?
    }

    pub async fn stat_entry(&self, path: &str) -> Result<RemoteEntry, SftpError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(WorkerCommand::Stat {
            path: normalize_remote_path(path, [""; 0]),
            reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| SftpError::WorkerClosed)?
    }

    /// Queue a single-file download, returning its operation id
    pub async fn download_file(
        &self,
        remote_path: &str,
        local_path: impl Into<PathBuf>,
    ) -> Result<Uuid, SftpError> {
        let operation = Uuid::new_v4();
        self.submit(WorkerCommand::DownloadFile {
            operation,
            remote_path: normalize_remote_path(remote_path, [""; 0]),
            local_path: local_path.into(),
        })
        .await?;
        Ok(operation)
    }

    /// Queue a recursive download of `remote_dir` into
    /// `local_parent/<directory name>`
    pub async fn download_directory(
        &self,
        remote_dir: &str,
        local_parent: impl Into<PathBuf>,
    ) -> Result<Uuid, SftpError> {
        let operation = Uuid::new_v4();
        self.submit(WorkerCommand::DownloadDirectory {
            operation,
            remote_dir: normalize_remote_path(remote_dir, [""; 0]),
            local_parent: local_parent.into(),
        })
        .await?;
        Ok(operation)
    }

    /// Like [`download_directory`](Self::download_directory), but rejects
    /// with [`SftpError::Busy`] instead of queueing behind other work.
    pub async fn try_download_directory(
        &self,
        remote_dir: &str,
        local_parent: impl Into<PathBuf>,
    ) -> Result<Uuid, SftpError> {
        if self
            .pending
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SftpError::Busy);
        }

        let operation = Uuid::new_v4();
        let cmd = WorkerCommand::DownloadDirectory {
            operation,
            remote_dir: normalize_remote_path(remote_dir, [""; 0]),
            local_parent: local_parent.into(),
        };
        if self.cmd_tx.send(cmd).await.is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(SftpError::WorkerClosed);
        }
        Ok(operation)
    }

    /// Close the remote session after all queued work has run
    pub async fn close(&self) -> Result<(), SftpError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(WorkerCommand::Close { reply_tx }).await?;
        reply_rx.await.map_err(|_| SftpError::WorkerClosed)?
    }
}

/// The task that owns the remote session
pub struct TransferWorker {
    remote: Arc<dyn RemoteFs>,
    event_tx: mpsc::UnboundedSender<TransferEvent>,
}

impl TransferWorker {
    /// Spawn the worker task, taking ownership of the session
    pub fn spawn(remote: Arc<dyn RemoteFs>) -> (TransferController, EventReceiver) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        let worker = TransferWorker { remote, event_tx };
        tokio::spawn(worker.run(cmd_rx, pending.clone()));

        (TransferController { cmd_tx, pending }, event_rx)
    }

    async fn run(self, mut cmd_rx: mpsc::Receiver<WorkerCommand>, pending: Arc<AtomicUsize>) {
        info!("Transfer worker started");

        while let Some(cmd) = cmd_rx.recv().await {
            let close_requested = matches!(cmd, WorkerCommand::Close { .. });
            self.execute(cmd).await;
            pending.fetch_sub(1, Ordering::SeqCst);
            if close_requested {
                break;
            }
        }

        // Drain commands queued behind a close
        cmd_rx.close();
        while let Ok(cmd) = cmd_rx.try_recv() {
            self.reject(cmd);
            pending.fetch_sub(1, Ordering::SeqCst);
        }

        info!("Transfer worker stopped");
    }

    async fn execute(&self, cmd: WorkerCommand) {
        match cmd {
            WorkerCommand::List { path, reply_tx } => {
                let _ = reply_tx.send(self.remote.list_entries(&path).await);
            }
            WorkerCommand::Stat { path, reply_tx } => {
                let _ = reply_tx.send(self.remote.stat_entry(&path).await);
            }
            WorkerCommand::DownloadFile {
                operation,
                remote_path,
                local_path,
            } => {
                let kind = match self.download_file(operation, &remote_path, &local_path).await {
                    Ok(entry) => TransferEventKind::Completed { entry },
                    Err(e) => {
                        warn!("Download of {} failed: {}", remote_path, e);
                        TransferEventKind::Failed {
                            message: e.to_string(),
                        }
                    }
                };
                self.emit(operation, kind);
            }
            WorkerCommand::DownloadDirectory {
                operation,
                remote_dir,
                local_parent,
            } => {
                let kind = match self
                    .download_directory(operation, &remote_dir, &local_parent)
                    .await
                {
                    Ok(entry) => TransferEventKind::Completed { entry },
                    Err(e) => {
                        error!("Directory download of {} failed: {}", remote_dir, e);
                        TransferEventKind::Failed {
                            message: e.to_string(),
                        }
                    }
                };
                self.emit(operation, kind);
            }
            WorkerCommand::Close { reply_tx } => {
                let _ = reply_tx.send(self.remote.close().await);
            }
        }
    }

    fn reject(&self, cmd: WorkerCommand) {
        match cmd {
            WorkerCommand::List { reply_tx, .. } => {
                let _ = reply_tx.send(Err(SftpError::WorkerClosed));
            }
            WorkerCommand::Stat { reply_tx, .. } => {
                let _ = reply_tx.send(Err(SftpError::WorkerClosed));
            }
            WorkerCommand::DownloadFile { operation, .. }
            | WorkerCommand::DownloadDirectory { operation, .. } => {
                self.emit(
                    operation,
                    TransferEventKind::Failed {
                        message: SftpError::WorkerClosed.to_string(),
                    },
                );
            }
            WorkerCommand::Close { reply_tx } => {
                let _ = reply_tx.send(Ok(()));
            }
        }
    }

    fn emit(&self, operation: Uuid, kind: TransferEventKind) {
        if self.event_tx.send(TransferEvent { operation, kind }).is_err() {
            debug!("Event receiver dropped, discarding event for {}", operation);
        }
    }

    async fn download_file(
        &self,
        operation: Uuid,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<LedgerEntry, SftpError> {
        info!("Downloading {} to {}", remote_path, local_path.display());

        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SftpError::local_io(parent, e))?;
        }

        let name = remote_file_name(remote_path).unwrap_or_else(|| remote_path.to_string());
        let event_tx = self.event_tx.clone();
        let bytes = self
            .remote
            .fetch_file(remote_path, local_path, &mut |transferred, total| {
                let report = format_file_progress(&name, transferred, total);
                let _ = event_tx.send(TransferEvent {
                    operation,
                    kind: report.into(),
                });
            })
            .await?;

        info!("Downloaded {} ({})", remote_path, format_size(bytes));
        Ok(LedgerEntry::new(remote_path, local_path, bytes, false))
    }

    async fn download_directory(
        &self,
        operation: Uuid,
        remote_dir: &str,
        local_parent: &Path,
    ) -> Result<LedgerEntry, SftpError> {
        let target = directory_download_target(local_parent, remote_dir);
        info!("Downloading directory {} to {}", remote_dir, target.display());

        self.emit(operation, scanning_report(remote_dir).into());
        let totals = scan(self.remote.as_ref(), remote_dir).await;

        let event_tx = self.event_tx.clone();
        let summary = transfer_directory(
            self.remote.as_ref(),
            remote_dir,
            &target,
            totals,
            &mut |report| {
                let _ = event_tx.send(TransferEvent {
                    operation,
                    kind: report.into(),
                });
            },
        )
        .await?;

        let mut text = format!(
            "Downloaded {} files ({})",
            summary.progress.files_done,
            format_size(summary.progress.bytes_done)
        );
        if summary.skipped() > 0 {
            text.push_str(&format!(", {} skipped", summary.skipped()));
        }
        self.emit(
            operation,
            TransferEventKind::Progress {
                percent: 100.0,
                text,
            },
        );

        Ok(LedgerEntry::new(remote_dir, target, totals.total_bytes, true))
    }
}
