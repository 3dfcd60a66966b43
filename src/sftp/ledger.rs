//! Download ledger
//!
//! Record of completed downloads for the current session. Entries are
//! appended once per finished operation and never modified afterwards.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::SftpError;

/// One completed download (single file or whole directory)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Identity used by [`DownloadLedger::remove`]
    pub id: Uuid,
    pub remote_path: String,
    pub local_path: PathBuf,
    pub size_bytes: u64,
    pub timestamp: DateTime<Local>,
    pub is_directory: bool,
}

impl LedgerEntry {
    pub fn new(
        remote_path: impl Into<String>,
        local_path: impl Into<PathBuf>,
        size_bytes: u64,
        is_directory: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            remote_path: remote_path.into(),
            local_path: local_path.into(),
            size_bytes,
            timestamp: Local::now(),
            is_directory,
        }
    }

    /// Folder that holds the downloaded item
    pub fn containing_folder(&self) -> Option<&Path> {
        self.local_path.parent()
    }
}

/// Session-scoped list of completed downloads
///
/// Internally synchronized, so completion handlers on different threads may
/// record concurrently.
#[derive(Debug, Default)]
pub struct DownloadLedger {
    /// Insertion order
    entries: RwLock<Vec<LedgerEntry>>,
}

impl DownloadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: LedgerEntry) {
        debug!("Ledger: recorded {} -> {}", entry.remote_path, entry.local_path.display());
        self.entries.write().push(entry);
    }

    /// Entries most recent first
    pub fn list(&self) -> Vec<LedgerEntry> {
        self.entries.read().iter().rev().cloned().collect()
    }

    /// Entry by its 1-based position in [`list`](Self::list)
    pub fn nth_recent(&self, number: usize) -> Option<LedgerEntry> {
        let index = number.checked_sub(1)?;
        self.entries.read().iter().rev().nth(index).cloned()
    }

    /// Entries in the order they were recorded
    pub fn entries_in_order(&self) -> Vec<LedgerEntry> {
        self.entries.read().clone()
    }

    /// Remove one entry, returning whether it was present
    pub fn remove(&self, id: Uuid) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        before != entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Write a JSON snapshot of the ledger
    pub async fn save_to(&self, path: &Path) -> Result<(), SftpError> {
        let json = serde_json::to_string_pretty(&self.entries_in_order())
            .map_err(|e| SftpError::StorageError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SftpError::local_io(parent, e))?;
        }

        // Write to temp file first, then rename
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| SftpError::local_io(&temp_path, e))?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| SftpError::local_io(path, e))?;

        info!("Saved {} download records to {}", self.len(), path.display());
        Ok(())
    }

    /// Load a snapshot written by [`save_to`](Self::save_to); a missing file
    /// yields an empty ledger.
    pub async fn load_from(path: &Path) -> Result<Self, SftpError> {
        let entries: Vec<LedgerEntry> = match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| SftpError::StorageError(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(SftpError::local_io(path, e)),
        };
        debug!("Loaded {} download records from {}", entries.len(), path.display());
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_then_list() {
        let ledger = DownloadLedger::new();
        let entry = LedgerEntry::new("/r/a.txt", "/l/a.txt", 10, false);
        ledger.record(entry.clone());
        assert_eq!(ledger.list(), vec![entry]);
    }

    #[test]
    fn test_list_is_most_recent_first() {
        let ledger = DownloadLedger::new();
        let first = LedgerEntry::new("/r/1", "/l/1", 1, false);
        let second = LedgerEntry::new("/r/2", "/l/2", 2, true);
        ledger.record(first.clone());
        ledger.record(second.clone());

        assert_eq!(ledger.list(), vec![second.clone(), first.clone()]);
        assert_eq!(ledger.entries_in_order(), vec![first, second]);
    }

    #[test]
    fn test_nth_recent() {
        let ledger = DownloadLedger::new();
        let first = LedgerEntry::new("/r/1", "/l/1", 1, false);
        let second = LedgerEntry::new("/r/2", "/l/2", 2, false);
        ledger.record(first.clone());
        ledger.record(second.clone());

        assert_eq!(ledger.nth_recent(1), Some(second));
        assert_eq!(ledger.nth_recent(2), Some(first));
        assert_eq!(ledger.nth_recent(0), None);
        assert_eq!(ledger.nth_recent(3), None);
    }

    #[test]
    fn test_remove_by_identity() {
        let ledger = DownloadLedger::new();
        let entry = LedgerEntry::new("/r/a.txt", "/l/a.txt", 10, false);
        // Same paths, different identity
        let twin = LedgerEntry::new("/r/a.txt", "/l/a.txt", 10, false);
        ledger.record(entry.clone());

        assert!(!ledger.remove(twin.id));
        assert!(ledger.remove(entry.id));
        assert!(ledger.is_empty());
        assert!(!ledger.remove(entry.id));
    }

    #[test]
    fn test_clear() {
        let ledger = DownloadLedger::new();
        ledger.clear();
        assert!(ledger.is_empty());
        for i in 0..5 {
            ledger.record(LedgerEntry::new(format!("/r/{i}"), format!("/l/{i}"), i, false));
        }
        assert_eq!(ledger.len(), 5);
        ledger.clear();
        assert!(ledger.list().is_empty());
    }

    #[test]
    fn test_containing_folder() {
        let entry = LedgerEntry::new("/r/a.txt", "/home/me/Downloads/a.txt", 1, false);
        assert_eq!(
            entry.containing_folder(),
            Some(Path::new("/home/me/Downloads"))
        );
    }

    #[tokio::test]
    async fn test_save_and_load_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("downloads.json");

        let ledger = DownloadLedger::new();
        ledger.record(LedgerEntry::new("/r/1", "/l/1", 1, false));
        ledger.record(LedgerEntry::new("/r/2", "/l/2", 2, true));
        ledger.save_to(&path).await.unwrap();

        let loaded = DownloadLedger::load_from(&path).await.unwrap();
        assert_eq!(loaded.entries_in_order(), ledger.entries_in_order());
    }

    #[tokio::test]
    async fn test_load_missing_snapshot_is_empty() {
        let dir = tempdir().unwrap();
        let loaded = DownloadLedger::load_from(&dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(loaded.is_empty());
    }
}
