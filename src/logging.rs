use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "GUESTLIST_LOG";

pub fn default_log_path() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine data directory")?;
    Ok(base.data_dir().join("guestlist").join("guestlist.log"))
}

/// Send tracing output to `path`. Stdout belongs to the terminal UI and to
/// command output, so nothing is logged there.
///
/// The returned guard flushes pending lines when dropped; keep it alive for
/// the life of the process.
pub fn init(path: &Path, default_level: &str) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let file_name = path
        .file_name()
        .context("log file path has no file name")?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(guard)
}
