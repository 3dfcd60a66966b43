//! SSH Client implementation using russh

use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Handle};
use russh::keys::PublicKey;
use tracing::{debug, info, warn};

use super::config::SshConfig;
use super::error::SshError;
use super::known_hosts::{get_known_hosts, HostKeyVerification};
use crate::sftp::SftpSession;

pub struct SshClient {
    config: SshConfig,
}

impl SshClient {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Connect, authenticate and open the `sftp` subsystem
    pub async fn connect(self) -> Result<SftpSession, SshError> {
        let address = self.config.address();
        let handle = self.authenticate().await?;

        let session = SftpSession::open(handle)
            .await
            .map_err(|e| SshError::ChannelError(e.to_string()))?;
        info!("SFTP session ready on {}", address);
        Ok(session)
    }

    async fn authenticate(&self) -> Result<Handle<ClientHandler>, SshError> {
        let addr = self.config.address();
        let timeout = Duration::from_secs(self.config.timeout_secs);

        info!("Connecting to SSH server at {}", addr);

        let socket_addr = tokio::net::lookup_host(&addr)
            .await
            .map_err(|e| SshError::ConnectionFailed(format!("Failed to resolve address: {}", e)))?
            .next()
            .ok_or_else(|| SshError::ConnectionFailed("No address found".to_string()))?;

        let ssh_config = client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(Duration::from_secs(30)),
            keepalive_max: 3,
            ..Default::default()
        };

        let handler = ClientHandler::new(
            self.config.host.clone(),
            self.config.port,
            self.config.strict_host_key_checking,
        );

        let mut handle = tokio::time::timeout(
            timeout,
            client::connect(Arc::new(ssh_config), socket_addr, handler),
        )
        .await
        .map_err(|_| SshError::Timeout(format!("Connection to {} timed out", addr)))?
        .map_err(|e| match e {
            SshError::HostKeyRejected(_) => e,
            other => SshError::ConnectionFailed(other.to_string()),
        })?;

        debug!("SSH handshake completed");

        let auth = tokio::time::timeout(
            timeout,
            handle.authenticate_password(&self.config.username, &self.config.password),
        )
        .await
        .map_err(|_| SshError::Timeout("Authentication timed out".to_string()))?
        .map_err(|e| SshError::AuthenticationFailed(e.to_string()))?;

        if !auth.success() {
            return Err(SshError::AuthenticationFailed(format!(
                "Server rejected credentials for {}",
                self.config.username
            )));
        }

        info!("SSH authentication successful for {}", self.config.username);
        Ok(handle)
    }
}

/// Client handler for russh callbacks; verifies the server host key.
pub struct ClientHandler {
    host: String,
    port: u16,
    /// - true: reject unknown keys
    /// - false: accept and remember unknown keys
    /// Changed keys are rejected either way.
    strict: bool,
}

impl ClientHandler {
    pub fn new(host: String, port: u16, strict: bool) -> Self {
        Self { host, port, strict }
    }
}

impl client::Handler for ClientHandler {
    type Error = SshError;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        let known_hosts = get_known_hosts();

        match known_hosts.verify(&self.host, self.port, server_public_key) {
            HostKeyVerification::Verified => {
                info!("Host key verified for {}:{}", self.host, self.port);
                Ok(true)
            }
            HostKeyVerification::Unknown { fingerprint } if self.strict => {
                warn!(
                    "Unknown host key for {}:{} ({}), strict checking enabled",
                    self.host, self.port, fingerprint
                );
                Err(SshError::HostKeyRejected(format!(
                    "unknown host {}:{} with fingerprint {}. Add it to known_hosts or disable strict checking.",
                    self.host, self.port, fingerprint
                )))
            }
            HostKeyVerification::Unknown { fingerprint } => {
                info!(
                    "New host {}:{}, adding to known_hosts ({})",
                    self.host, self.port, fingerprint
                );
                if let Err(e) = known_hosts.add_host(&self.host, self.port, server_public_key) {
                    warn!("Failed to save host key: {}", e);
                }
                Ok(true)
            }
            HostKeyVerification::Changed {
                expected_fingerprint,
                actual_fingerprint,
            } => {
                warn!(
                    "HOST KEY CHANGED for {}:{}! Expected {}, got {}",
                    self.host, self.port, expected_fingerprint, actual_fingerprint
                );
                Err(SshError::HostKeyRejected(format!(
                    "key for {}:{} has changed (expected {}, got {}). \
                     If this is legitimate, remove the old entry from {}",
                    self.host,
                    self.port,
                    expected_fingerprint,
                    actual_fingerprint,
                    known_hosts.path().display()
                )))
            }
        }
    }
}
