//! SFTP Session
//!
//! Provides the remote filesystem operations over an authenticated SSH
//! connection.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::Handle;
use russh_sftp::client::error::Error as SftpErrorInner;
use russh_sftp::client::SftpSession as RusshSftpSession;
use russh_sftp::protocol::FileAttributes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::error::SftpError;
use super::path_utils::{normalize_remote_path, remote_file_name};
use super::remote::{ProgressCallback, RemoteFs};
use super::types::{EntryKind, RemoteEntry};
use crate::ssh::ClientHandler;

/// Read chunk size for downloads
const CHUNK_SIZE: usize = 64 * 1024;

/// SFTP I/O timeout to prevent zombie transfers on SSH disconnect
const SFTP_IO_TIMEOUT: Duration = Duration::from_secs(300);

/// SFTP Session wrapper
pub struct SftpSession {
    sftp: RusshSftpSession,
    handle: Handle<ClientHandler>,
    /// Directory the server considers the login directory
    home: String,
}

impl SftpSession {
    /// Open the `sftp` subsystem on an authenticated connection
    pub async fn open(handle: Handle<ClientHandler>) -> Result<Self, SftpError> {
        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| SftpError::ChannelError(e.to_string()))?;

        channel.request_subsystem(true, "sftp").await.map_err(|e| {
            SftpError::SubsystemNotAvailable(format!("Failed to request SFTP subsystem: {}", e))
        })?;

        let sftp = RusshSftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SftpError::SubsystemNotAvailable(e.to_string()))?;

        let home = sftp
            .canonicalize(".")
            .await
            .map(|p| normalize_remote_path(&p, [""; 0]))
            .unwrap_or_else(|_| "/".to_string());

        info!("SFTP subsystem opened, home directory {}", home);

        Ok(Self { sftp, handle, home })
    }

    /// Login directory reported by the server
    pub fn home(&self) -> &str {
        &self.home
    }

    fn entry_from_attrs(name: String, attrs: &FileAttributes) -> RemoteEntry {
        let kind = if attrs.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        RemoteEntry {
            name,
            kind,
            size: attrs.size.unwrap_or(0),
            modified: attrs.mtime.map(|t| t as i64).unwrap_or(0),
            permissions: attrs.permissions.unwrap_or(0),
        }
    }

    /// Map SFTP errors to our error type
    fn map_sftp_error(err: SftpErrorInner, path: &str) -> SftpError {
        let err_str = err.to_string();
        if err_str.contains("No such file") || err_str.contains("not found") {
            SftpError::FileNotFound(path.to_string())
        } else if err_str.contains("Permission denied") {
            SftpError::PermissionDenied(path.to_string())
        } else {
            SftpError::ProtocolError(format!("{}: {}", path, err_str))
        }
    }
}

#[async_trait]
impl RemoteFs for SftpSession {
    async fn list_entries(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError> {
        let path = normalize_remote_path(path, [""; 0]);
        debug!("Listing directory: {}", path);

        let read_dir = self
            .sftp
            .read_dir(&path)
            .await
            .map_err(|e| Self::map_sftp_error(e, &path))?;

        let mut entries: Vec<RemoteEntry> = read_dir
            .filter(|entry| {
                let name = entry.file_name();
                name != "." && name != ".."
            })
            .map(|entry| Self::entry_from_attrs(entry.file_name(), &entry.metadata()))
            .collect();

        // Directories first, then by name
        entries.sort_by(|a, b| {
            b.is_dir()
                .cmp(&a.is_dir())
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });

        debug!("Listed {} entries in {}", entries.len(), path);
        Ok(entries)
    }

    async fn stat_entry(&self, path: &str) -> Result<RemoteEntry, SftpError> {
        let path = normalize_remote_path(path, [""; 0]);
        let attrs = self
            .sftp
            .metadata(&path)
            .await
            .map_err(|e| Self::map_sftp_error(e, &path))?;

        let name = remote_file_name(&path).unwrap_or_else(|| "/".to_string());
        Ok(Self::entry_from_attrs(name, &attrs))
    }

    async fn fetch_file(
        &self,
        remote_path: &str,
        local_path: &Path,
        on_progress: ProgressCallback<'_>,
    ) -> Result<u64, SftpError> {
        let remote_path = normalize_remote_path(remote_path, [""; 0]);
        let total_bytes = self
            .sftp
            .metadata(&remote_path)
            .await
            .map_err(|e| Self::map_sftp_error(e, &remote_path))?
            .size
            .unwrap_or(0);

        let mut remote_file = self
            .sftp
            .open(&remote_path)
            .await
            .map_err(|e| Self::map_sftp_error(e, &remote_path))?;

        let mut local_file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| SftpError::local_io(local_path, e))?;

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut transferred = 0u64;

        loop {
            let bytes_read =
                match tokio::time::timeout(SFTP_IO_TIMEOUT, remote_file.read(&mut buffer)).await {
                    Ok(Ok(n)) => n,
                    Ok(Err(e)) => {
                        drop(local_file);
                        let _ = tokio::fs::remove_file(local_path).await;
                        return Err(SftpError::ProtocolError(format!("{}: {}", remote_path, e)));
                    }
                    Err(_) => {
                        warn!(
                            "SFTP read timeout after {:?} at {} bytes of {}",
                            SFTP_IO_TIMEOUT, transferred, remote_path
                        );
                        drop(local_file);
                        let _ = tokio::fs::remove_file(local_path).await;
                        return Err(SftpError::ProtocolError(format!(
                            "{}: read timeout after {:?}",
                            remote_path, SFTP_IO_TIMEOUT
                        )));
                    }
                };

            if bytes_read == 0 {
                break;
            }

            local_file
                .write_all(&buffer[..bytes_read])
                .await
                .map_err(|e| SftpError::local_io(local_path, e))?;

            transferred += bytes_read as u64;
            on_progress(transferred, total_bytes);
        }

        if transferred == 0 {
            on_progress(0, total_bytes);
        }

        local_file
            .flush()
            .await
            .map_err(|e| SftpError::local_io(local_path, e))?;

        debug!("Fetched {} ({} bytes)", remote_path, transferred);
        Ok(transferred)
    }

    async fn create_dir(&self, path: &str) -> Result<(), SftpError> {
        let path = normalize_remote_path(path, [""; 0]);
        info!("Creating directory: {}", path);
        self.sftp
            .create_dir(&path)
            .await
            .map_err(|e| Self::map_sftp_error(e, &path))
    }

    async fn close(&self) -> Result<(), SftpError> {
        if let Err(e) = self.sftp.close().await {
            warn!("Error closing SFTP subsystem: {}", e);
        }
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "Session closed", "en")
            .await
            .map_err(|e| SftpError::ChannelError(e.to_string()))?;
        info!("SFTP session closed");
        Ok(())
    }
}
