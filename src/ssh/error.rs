//! SSH Error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SshError {
    /// Host unreachable, handshake failure and other network-level problems
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Host key rejected: {0}")]
    HostKeyRejected(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("SSH protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Login cancelled")]
    Cancelled,

    #[error("Disconnected")]
    Disconnected,
}

impl SshError {
    /// Credentials were rejected; worth asking the user again
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, SshError::AuthenticationFailed(_))
    }
}

impl From<russh::Error> for SshError {
    fn from(err: russh::Error) -> Self {
        SshError::ProtocolError(err.to_string())
    }
}

impl serde::Serialize for SshError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_classification() {
        assert!(SshError::AuthenticationFailed("denied".into()).is_auth_failure());
        assert!(!SshError::ConnectionFailed("refused".into()).is_auth_failure());
        assert!(!SshError::Timeout("30s".into()).is_auth_failure());
    }
}
