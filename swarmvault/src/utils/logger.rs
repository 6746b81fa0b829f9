//! Logging configuration using tracing.
//!
//! Every session logs to the console and appends to `<backup_root>/backup.log`.
//! The log file is never rotated or truncated here.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name of the persistent session log inside the backup root.
pub const LOG_FILE_NAME: &str = "backup.log";

/// Open the session log for appending, creating it if needed.
///
/// The parent directory is not created.
pub fn open_log_file(log_path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(log_path)
}

/// Initialize console and file logging with the specified level.
///
/// Fails if `log_path` cannot be opened for appending; nothing is installed
/// in that case.
pub fn init(level: &str, log_path: &Path) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let log_file = open_log_file(log_path)
        .map_err(|e| anyhow::anyhow!("Cannot open log file {}: {}", log_path.display(), e))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(log_file)))
        .try_init()?;

    Ok(())
}
