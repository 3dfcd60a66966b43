//! Host key verification against `~/.ssh/known_hosts`
//!
//! Only plain (non-hashed) host entries are understood. Unknown hosts are
//! appended in OpenSSH format, `[host]:port` for non-default ports.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use parking_lot::RwLock;
use russh::keys::{PublicKey, PublicKeyBase64};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::error::SshError;

/// Result of host key verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyVerification {
    Verified,
    /// Host not in known_hosts for this key type
    Unknown { fingerprint: String },
    /// Key differs from the stored one (potential MITM)
    Changed {
        expected_fingerprint: String,
        actual_fingerprint: String,
    },
}

/// `host -> [(key_type, base64_key)]`
type HostTable = HashMap<String, Vec<(String, String)>>;

pub struct KnownHostsStore {
    hosts: RwLock<HostTable>,
    path: PathBuf,
}

impl KnownHostsStore {
    /// Store backed by the user's `~/.ssh/known_hosts`
    pub fn open_default() -> Self {
        let path = dirs::home_dir()
            .map(|h| h.join(".ssh").join("known_hosts"))
            .unwrap_or_else(|| PathBuf::from(".ssh/known_hosts"));
        Self::with_path(path)
    }

    pub fn with_path(path: PathBuf) -> Self {
        let hosts = match fs::read_to_string(&path) {
            Ok(content) => parse_known_hosts(&content),
            Err(e) => {
                debug!("known_hosts not loaded from {}: {}", path.display(), e);
                HostTable::new()
            }
        };
        info!("Loaded {} known hosts from {}", hosts.len(), path.display());
        Self {
            hosts: RwLock::new(hosts),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lookup key in known_hosts notation
    fn host_key(host: &str, port: u16) -> String {
        let host = host.to_lowercase();
        if port == 22 {
            host
        } else {
            format!("[{}]:{}", host, port)
        }
    }

    pub fn verify(&self, host: &str, port: u16, key: &PublicKey) -> HostKeyVerification {
        self.verify_encoded(
            host,
            port,
            key.algorithm().as_str(),
            &BASE64.encode(key.public_key_bytes()),
        )
    }

    /// Verify an already encoded key (`ssh-ed25519`, base64 blob)
    pub fn verify_encoded(
        &self,
        host: &str,
        port: u16,
        key_type: &str,
        key_b64: &str,
    ) -> HostKeyVerification {
        let lookup = Self::host_key(host, port);
        let fingerprint = fingerprint_b64(key_b64);
        let hosts = self.hosts.read();

        let stored = hosts
            .get(&lookup)
            .and_then(|keys| keys.iter().find(|(t, _)| t == key_type));

        match stored {
            Some((_, data)) if data == key_b64 => {
                debug!("Host key verified for {} ({})", lookup, key_type);
                HostKeyVerification::Verified
            }
            Some((_, data)) => HostKeyVerification::Changed {
                expected_fingerprint: fingerprint_b64(data),
                actual_fingerprint: fingerprint,
            },
            None => HostKeyVerification::Unknown { fingerprint },
        }
    }

    pub fn add_host(&self, host: &str, port: u16, key: &PublicKey) -> Result<(), SshError> {
        self.add_encoded(
            host,
            port,
            key.algorithm().as_str(),
            &BASE64.encode(key.public_key_bytes()),
        )
    }

    /// Remember a key and append it to the file
    pub fn add_encoded(
        &self,
        host: &str,
        port: u16,
        key_type: &str,
        key_b64: &str,
    ) -> Result<(), SshError> {
        let lookup = Self::host_key(host, port);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{} {} {}", lookup, key_type, key_b64)?;

        self.hosts
            .write()
            .entry(lookup.clone())
            .or_default()
            .push((key_type.to_string(), key_b64.to_string()));

        info!("Added {} key for {} to {}", key_type, lookup, self.path.display());
        Ok(())
    }
}

/// `SHA256:<base64>` fingerprint of a base64-encoded key blob
pub fn fingerprint_b64(key_b64: &str) -> String {
    match BASE64.decode(key_b64) {
        Ok(bytes) => {
            let hash = Sha256::digest(&bytes);
            format!("SHA256:{}", BASE64.encode(hash).trim_end_matches('='))
        }
        Err(_) => "unknown".to_string(),
    }
}

fn parse_known_hosts(content: &str) -> HostTable {
    let mut hosts = HostTable::new();

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(names), Some(key_type), Some(key_data)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        // Markers such as @cert-authority are not supported
        if names.starts_with('@') {
            continue;
        }

        for name in names.split(',') {
            // Hashed hostnames (|1|...) cannot be matched without the salt
            if name.starts_with('|') {
                continue;
            }
            hosts
                .entry(name.to_lowercase())
                .or_default()
                .push((key_type.to_string(), key_data.to_string()));
        }
    }

    hosts
}

static KNOWN_HOSTS: std::sync::OnceLock<KnownHostsStore> = std::sync::OnceLock::new();

/// Process-wide store for the user's known_hosts
pub fn get_known_hosts() -> &'static KnownHostsStore {
    KNOWN_HOSTS.get_or_init(|| {
        let store = KnownHostsStore::open_default();
        if !store.path().exists() {
            warn!("No known_hosts file at {}", store.path().display());
        }
        store
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const KEY_A: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl";
    const KEY_B: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIAfuCHKVTjquxvt6CM6tdG4SLp1Btn/nOeHHE5UOzRdf";

    #[test]
    fn test_host_key() {
        assert_eq!(KnownHostsStore::host_key("GitHub.com", 22), "github.com");
        assert_eq!(KnownHostsStore::host_key("server.com", 2222), "[server.com]:2222");
    }

    #[test]
    fn test_parse_skips_comments_hashed_and_markers() {
        let table = parse_known_hosts(&format!(
            "# comment\n\
             \n\
             |1|abc=|def= ssh-ed25519 {KEY_A}\n\
             @cert-authority *.example.com ssh-ed25519 {KEY_A}\n\
             alpha,[beta]:2222 ssh-ed25519 {KEY_A} user@host\n\
             broken-line\n"
        ));
        assert_eq!(table.len(), 2);
        assert!(table.contains_key("alpha"));
        assert!(table.contains_key("[beta]:2222"));
    }

    #[test]
    fn test_verify_states() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("known_hosts");
        fs::write(&path, format!("example.com ssh-ed25519 {KEY_A}\n")).unwrap();
        let store = KnownHostsStore::with_path(path);

        assert_eq!(
            store.verify_encoded("example.com", 22, "ssh-ed25519", KEY_A),
            HostKeyVerification::Verified
        );
        assert!(matches!(
            store.verify_encoded("example.com", 22, "ssh-ed25519", KEY_B),
            HostKeyVerification::Changed { .. }
        ));
        // Same host on another port is a different entry
        assert!(matches!(
            store.verify_encoded("example.com", 2222, "ssh-ed25519", KEY_A),
            HostKeyVerification::Unknown { .. }
        ));
        // Unknown key type for a known host
        assert!(matches!(
            store.verify_encoded("example.com", 22, "ssh-rsa", KEY_B),
            HostKeyVerification::Unknown { .. }
        ));
    }

    #[test]
    fn test_add_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".ssh").join("known_hosts");
        let store = KnownHostsStore::with_path(path.clone());

        store
            .add_encoded("files.example.com", 2222, "ssh-ed25519", KEY_B)
            .unwrap();
        assert_eq!(
            store.verify_encoded("files.example.com", 2222, "ssh-ed25519", KEY_B),
            HostKeyVerification::Verified
        );

        let reloaded = KnownHostsStore::with_path(path);
        assert_eq!(
            reloaded.verify_encoded("files.example.com", 2222, "ssh-ed25519", KEY_B),
            HostKeyVerification::Verified
        );
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = fingerprint_b64(KEY_A);
        assert!(fp.starts_with("SHA256:"));
        assert!(!fp.ends_with('='));
        assert_eq!(fingerprint_b64("%%%"), "unknown");
    }
}
