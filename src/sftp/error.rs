//! SFTP Error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SftpError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("SFTP protocol error: {0}")]
    ProtocolError(String),

    #[error("SFTP subsystem not available: {0}")]
    SubsystemNotAvailable(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The local destination could not be created or written.
    #[error("Local I/O error at {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Another transfer is already running on this session")]
    Busy,

    #[error("Transfer worker is no longer running")]
    WorkerClosed,

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl SftpError {
    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SftpError::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Errors about a specific remote path. The scanner and executor recover
    /// from these by skipping the entry.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SftpError::FileNotFound(_) | SftpError::PermissionDenied(_) | SftpError::ProtocolError(_)
        )
    }

    /// Errors that make the local destination unusable.
    pub fn is_local(&self) -> bool {
        matches!(self, SftpError::LocalIo { .. })
    }
}

impl serde::Serialize for SftpError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
