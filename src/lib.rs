//! SFTP Browser - browse a remote server over SFTP and download files or
//! whole directory trees with live progress.

pub mod config;
pub mod launcher;
pub mod sftp;
pub mod ssh;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging
///
/// Log lines go to stderr so they do not interleave with the interactive
/// prompt. The filter is read from `RUST_LOG` and defaults to `info`.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
