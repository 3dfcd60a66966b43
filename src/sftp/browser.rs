//! Browsing state of the interactive thread
//!
//! Holds the current remote directory, the back history and the download
//! ledger. It never touches the session; the caller lists the new directory
//! through the [`TransferController`](super::transfer::TransferController)
//! and feeds worker events back through [`Browser::apply`].

use std::sync::Arc;

use tracing::debug;

use super::ledger::{DownloadLedger, LedgerEntry};
use super::path_utils::{join_remote_path, normalize_remote_path, remote_parent};
use super::transfer::{TransferEvent, TransferEventKind};

#[derive(Debug)]
pub struct Browser {
    current_path: String,
    history: Vec<String>,
    ledger: Arc<DownloadLedger>,
}

impl Browser {
    pub fn new(start_path: &str) -> Self {
        Self::with_ledger(start_path, Arc::new(DownloadLedger::new()))
    }

    pub fn with_ledger(start_path: &str, ledger: Arc<DownloadLedger>) -> Self {
        Self {
            current_path: normalize_remote_path(start_path, [""; 0]),
            history: Vec::new(),
            ledger,
        }
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn ledger(&self) -> &Arc<DownloadLedger> {
        &self.ledger
    }

    /// Absolute path of an entry of the current directory
    pub fn child_path(&self, name: &str) -> String {
        join_remote_path(&self.current_path, name)
    }

    /// Resolve a user supplied target: absolute paths as-is, anything else
    /// relative to the current directory.
    pub fn resolve(&self, target: &str) -> String {
        if target.starts_with('/') {
            normalize_remote_path(target, [""; 0])
        } else {
            self.child_path(target)
        }
    }

    /// Move to `path`, remembering the current directory for [`go_back`](Self::go_back).
    pub fn enter(&mut self, path: &str) {
        let path = normalize_remote_path(path, [""; 0]);
        if path == self.current_path {
            return;
        }
        let previous = std::mem::replace(&mut self.current_path, path);
        debug!("Browser: {} -> {}", previous, self.current_path);
        self.history.push(previous);
    }

    /// Step back through history, falling back to the parent directory.
    ///
    /// Returns the new current path, or `None` at the root with empty history.
    pub fn go_back(&mut self) -> Option<&str> {
        let target = match self.history.pop() {
            Some(previous) => previous,
            None if self.current_path != "/" => remote_parent(&self.current_path),
            None => return None,
        };
        self.current_path = target;
        Some(&self.current_path)
    }

    /// Undo the last [`enter`](Self::enter), used when listing the new
    /// directory failed.
    pub fn revert(&mut self) {
        if let Some(previous) = self.history.pop() {
            self.current_path = previous;
        }
    }

    /// Apply a worker event; completed operations are recorded in the ledger.
    ///
    /// Returns the recorded entry, if any.
    pub fn apply(&self, event: &TransferEvent) -> Option<LedgerEntry> {
        match &event.kind {
            TransferEventKind::Completed { entry } => {
                self.ledger.record(entry.clone());
                Some(entry.clone())
            }
            _ => None,
        }
    }
}
