//! SFTP file management module
//!
//! Remote browsing and downloads: a single worker task owns the session,
//! scans remote trees, mirrors them locally and reports progress back to the
//! interactive thread.

pub mod browser;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod path_utils;
pub mod progress;
pub mod remote;
pub mod scanner;
pub mod session;
pub mod transfer;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use browser::Browser;
pub use error::SftpError;
pub use executor::{transfer_directory, TransferSummary};
pub use ledger::{DownloadLedger, LedgerEntry};
pub use path_utils::{
    is_absolute_remote_path, join_remote_path, normalize_remote_path, remote_file_name,
    remote_parent,
};
pub use progress::{format_progress, format_size, ProgressReport};
pub use remote::{ProgressCallback, RemoteFs};
pub use scanner::scan;
pub use session::SftpSession;
pub use transfer::{
    directory_download_target, EventReceiver, TransferController, TransferEvent,
    TransferEventKind, TransferWorker,
};
pub use types::*;
