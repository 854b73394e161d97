//! Tracing subscriber setup.
//!
//! The interactive playground owns the terminal, so its diagnostics go to a log file; headless
//! commands log to stderr.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "WINDPLAY_LOG";
const LOG_FILE: &str = "windplay.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stderr.
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Append logs to `<state_dir>/windplay.log`, returning the file location.
pub fn init_file(state_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(state_dir)
        .with_context(|| format!("failed to create log directory {}", state_dir.display()))?;
    let path = state_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_log_file_in_state_dir() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let state = temp.path().join(".windplay");
        let path = init_file(&state)?;
        assert_eq!(path, state.join("windplay.log"));
        assert!(path.exists());
        Ok(())
    }
}
