//! Client settings

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ssh::{SshConfig, DEFAULT_MAX_AUTH_ATTEMPTS};

/// Persistent client preferences (`settings.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Where downloads land when no local path is given
    pub download_dir: PathBuf,

    /// Connection and authentication timeout
    pub timeout_secs: u64,

    /// Reject hosts missing from known_hosts
    pub strict_host_key_checking: bool,

    /// Keep the download list across runs
    pub persist_downloads: bool,

    /// Password re-prompts before asking for a whole new login
    pub max_auth_attempts: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            timeout_secs: 30,
            strict_host_key_checking: false,
            persist_downloads: false,
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
        }
    }
}

impl ClientSettings {
    /// Copy connection-related preferences onto `config`
    pub fn apply_to(&self, config: &mut SshConfig) {
        config.timeout_secs = self.timeout_secs;
        config.strict_host_key_checking = self.strict_host_key_checking;
    }
}
