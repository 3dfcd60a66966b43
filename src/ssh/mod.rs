//! SSH module - connection setup for the SFTP browser
//!
//! # Features
//! - `sftp://` startup URL parsing
//! - Password authentication with bounded re-prompting
//! - Host key verification via ~/.ssh/known_hosts

mod client;
mod config;
mod error;
pub mod known_hosts;
mod retry;
mod url;

pub use client::{ClientHandler, SshClient};
pub use config::SshConfig;
pub use error::SshError;
pub use known_hosts::{get_known_hosts, HostKeyVerification, KnownHostsStore};
pub use retry::{connect_with_retry, CredentialPrompt, DEFAULT_MAX_AUTH_ATTEMPTS};
pub use self::url::{ConnectUrl, UrlError, DEFAULT_SSH_PORT, SFTP_SCHEME};
