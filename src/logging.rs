//! Logging setup using `tracing-subscriber`.
//!
//! The terminal UI owns stdout, so the host writes logs to a file in the
//! data directory. `RUST_LOG` takes precedence over the configured filter.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set and valid, else `fallback`.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global subscriber appending to `log_path`.
pub fn init_file_logging(log_path: &Path, filter: &str) -> std::io::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file: File = OpenOptions::new().create(true).append(true).open(log_path)?;

    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init();

    if let Err(e) = result {
        // Already initialized (e.g. by a test harness); keep the existing one
        eprintln!("logging already initialized: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("termrace.log");
        init_file_logging(&path, "termrace=debug").unwrap();
        assert!(path.exists());
    }
}
