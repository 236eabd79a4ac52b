//! File logging. The terminal is in raw mode while the UI runs, so log records
//! only ever go to a file, and only when one is asked for.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use crate::config::{AppConfig, parse_level_name};

fn default_log_path() -> Result<PathBuf> {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let mut dir = dirs::cache_dir().context("failed to locate user cache directory")?;
    dir.push("gittrisect");
    fs::create_dir_all(&dir).with_context(|| format!("failed creating {}", dir.display()))?;
    Ok(dir.join(format!("gittrisect-{timestamp}.log")))
}

/// Returns the log file path when logging was enabled.
pub fn init(config: &AppConfig) -> Result<Option<PathBuf>> {
    if !config.logging_enabled() {
        return Ok(None);
    }

    let path = match &config.log_file {
        Some(path) => path.clone(),
        None => default_log_path()?,
    };
    let level = config
        .log_level
        .as_deref()
        .and_then(parse_level_name)
        .unwrap_or(LevelFilter::Debug);

    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_time_offset_to_local()
        .unwrap_or_else(|builder| builder)
        .build();

    let file =
        File::create(&path).with_context(|| format!("failed creating log file {}", path.display()))?;
    WriteLogger::init(level, log_config, file).context("failed initializing logger")?;
    Ok(Some(path))
}
