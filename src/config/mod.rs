//! Configuration Management Module
//!
//! Client settings and the on-disk locations the browser uses.

pub mod settings;
pub mod storage;

pub use settings::ClientSettings;
pub use storage::{config_dir, downloads_file, settings_file, SettingsStorage, StorageError};
