//! Configuration Storage
//!
//! Handles reading/writing the settings file to disk.
//! Config location: ~/.sftp-browser on macOS/Linux, %APPDATA%\SftpBrowser on Windows

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::settings::ClientSettings;

/// Configuration storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returns %APPDATA%\SftpBrowser on Windows, ~/.sftp-browser elsewhere
pub fn config_dir() -> Result<PathBuf, StorageError> {
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("SftpBrowser"));
        }
        dirs::home_dir()
            .map(|home| home.join(".sftp-browser"))
            .ok_or(StorageError::NoConfigDir)
    }

    #[cfg(not(windows))]
    {
        dirs::home_dir()
            .map(|home| home.join(".sftp-browser"))
            .ok_or(StorageError::NoConfigDir)
    }
}

pub fn settings_file() -> Result<PathBuf, StorageError> {
    Ok(config_dir()?.join("settings.json"))
}

/// Snapshot of the download ledger, written when persistence is enabled
pub fn downloads_file() -> Result<PathBuf, StorageError> {
    Ok(config_dir()?.join("downloads.json"))
}

/// Settings file manager
pub struct SettingsStorage {
    path: PathBuf,
}

impl SettingsStorage {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            path: settings_file()?,
        })
    }

    /// Storage at a custom path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings; a missing file yields defaults, a corrupted one is
    /// backed up and replaced by defaults.
    pub async fn load(&self) -> Result<ClientSettings, StorageError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ClientSettings::default())
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        match serde_json::from_str::<ClientSettings>(&contents) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!("Settings file corrupted: {}", e);
                match self.backup().await {
                    Ok(backup_path) => tracing::warn!(
                        "Corrupted settings backed up to {}, using defaults",
                        backup_path.display()
                    ),
                    Err(backup_err) => {
                        tracing::error!("Failed to back up corrupted settings: {}", backup_err)
                    }
                }
                Ok(ClientSettings::default())
            }
        }
    }

    pub async fn save(&self, settings: &ClientSettings) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to temp file first, then rename
        let temp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(settings)?;

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    async fn backup(&self) -> Result<PathBuf, StorageError> {
        let backup_path = self.path.with_extension(format!(
            "json.backup.{}",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        ));
        fs::copy(&self.path, &backup_path).await?;
        Ok(backup_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_nonexistent() {
        let temp = tempdir().unwrap();
        let storage = SettingsStorage::with_path(temp.path().join("settings.json"));

        let settings = storage.load().await.unwrap();
        assert_eq!(settings, ClientSettings::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = tempdir().unwrap();
        let storage = SettingsStorage::with_path(temp.path().join("nested").join("settings.json"));

        let settings = ClientSettings {
            timeout_secs: 5,
            persist_downloads: true,
            ..Default::default()
        };
        storage.save(&settings).await.unwrap();

        assert_eq!(storage.load().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_corrupted_file_is_backed_up() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let storage = SettingsStorage::with_path(path);

        assert_eq!(storage.load().await.unwrap(), ClientSettings::default());
        let backups = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains("backup"))
            .count();
        assert_eq!(backups, 1);
    }
}
