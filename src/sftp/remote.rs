//! Remote filesystem seam
//!
//! The scanner, executor and transfer worker only talk to the server through
//! [`RemoteFs`]. `SftpSession` is the production implementation; tests use an
//! in-memory tree.

use std::path::Path;

use async_trait::async_trait;

use super::error::SftpError;
use super::types::RemoteEntry;

/// Per-chunk progress callback: `(bytes_transferred_so_far, file_total_bytes)`.
pub type ProgressCallback<'a> = &'a mut (dyn FnMut(u64, u64) + Send);

#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// List a directory, without `.` and `..`.
    async fn list_entries(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError>;

    /// Attributes of a single path.
    async fn stat_entry(&self, path: &str) -> Result<RemoteEntry, SftpError>;

    /// Copy one remote file to `local_path`, returning the bytes written.
    async fn fetch_file(
        &self,
        remote_path: &str,
        local_path: &Path,
        on_progress: ProgressCallback<'_>,
    ) -> Result<u64, SftpError>;

    async fn create_dir(&self, path: &str) -> Result<(), SftpError>;

    async fn close(&self) -> Result<(), SftpError>;
}
