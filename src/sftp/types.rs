//! SFTP data types

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Kind of a remote entry.
///
/// Symbolic links are reported with the kind the server's attributes give
/// them; they are never transferred as links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// File name (not full path)
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
    /// File size in bytes
    pub size: u64,
    /// Last modified time (Unix timestamp, seconds)
    pub modified: i64,
    /// Raw mode bits as reported by the server
    pub permissions: u32,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
            modified: 0,
            permissions: 0o644,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
            modified: 0,
            permissions: 0o755,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Modification time in the local timezone
    pub fn modified_at(&self) -> Option<DateTime<Local>> {
        Local.timestamp_opt(self.modified, 0).single()
    }

    /// `ls -l` style permission string, e.g. `rwxr-xr-x`
    pub fn permissions_string(&self) -> String {
        const FLAGS: [(u32, char); 9] = [
            (0o400, 'r'),
            (0o200, 'w'),
            (0o100, 'x'),
            (0o040, 'r'),
            (0o020, 'w'),
            (0o010, 'x'),
            (0o004, 'r'),
            (0o002, 'w'),
            (0o001, 'x'),
        ];
        FLAGS
            .iter()
            .map(|&(bit, c)| if self.permissions & bit != 0 { c } else { '-' })
            .collect()
    }
}

/// Aggregate size of a directory tree, computed before any bytes move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTotals {
    pub total_files: u64,
    pub total_bytes: u64,
}

/// Accumulated progress of one directory download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    pub files_done: u64,
    pub bytes_done: u64,
}

impl TransferProgress {
    /// Count one finished file of `size` bytes.
    pub fn complete_file(&mut self, size: u64) {
        self.files_done += 1;
        self.bytes_done += size;
    }
}
