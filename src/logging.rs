use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "qlauncher.log";

/// Send tracing output to the log file in `data_dir`.
///
/// `RUST_LOG` wins; otherwise only errors are logged unless `debug` is set.
pub fn init(data_dir: &Path, debug: bool) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Unable to create {}", data_dir.display()))?;
    let path = data_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Unable to open log file {}", path.display()))?;

    let default_level = if debug { "debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Unable to set up logging: {}", e))
}
