//! SSH Configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use super::url::ConnectUrl;

/// SSH connection configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SshConfig {
    /// Remote host address
    pub host: String,

    /// SSH port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for authentication
    pub username: String,

    /// Password for authentication
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Strict host key checking (default: false)
    /// - true: reject connections to unknown hosts
    /// - false: auto-accept unknown hosts, still reject changed keys
    #[serde(default)]
    pub strict_host_key_checking: bool,
}

fn default_port() -> u16 {
    22
}

fn default_timeout() -> u64 {
    30
}

impl SshConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: username.into(),
            password: password.into(),
            timeout_secs: default_timeout(),
            strict_host_key_checking: false,
        }
    }

    /// Build a config from a startup URL; missing credentials stay empty.
    pub fn from_url(url: &ConnectUrl) -> Self {
        Self {
            port: url.port,
            ..Self::new(
                url.host.clone(),
                url.username.clone().unwrap_or_default(),
                url.password.clone().unwrap_or_default(),
            )
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .field("strict_host_key_checking", &self.strict_host_key_checking)
            .finish()
    }
}
