//! Platform launcher
//!
//! Opens downloaded files with the desktop's default application, or shows
//! their containing folder.

use std::path::Path;

use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Path does not exist: {0}")]
    NotFound(String),

    #[error("Failed to launch '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Program used to hand a path to the desktop environment
pub fn opener_program() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

/// Open `path` with the default application for its type.
pub async fn open_path(path: &Path) -> Result<(), LaunchError> {
    let shown = path.display().to_string();
    if tokio::fs::metadata(path).await.is_err() {
        return Err(LaunchError::NotFound(shown));
    }

    info!("Opening {} with {}", shown, opener_program());
    tokio::process::Command::new(opener_program())
        .arg(path)
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            path: shown,
            source,
        })?;
    Ok(())
}

/// Show the folder that holds `path`.
pub async fn reveal_path(path: &Path) -> Result<(), LaunchError> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => open_path(parent).await,
        None => open_path(Path::new(".")).await,
    }
}
