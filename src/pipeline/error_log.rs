//! Append-only log of items that failed and were skipped

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

/// One line per failure: `{coordinate} -- {error}`
pub struct ErrorLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ErrorLog {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a failure. Write errors are logged and otherwise ignored.
    pub fn record(&self, coordinate: &str, error: &dyn Display) {
        let Ok(mut file) = self.file.lock() else {
            warn!("Error log lock poisoned, dropping entry for {}", coordinate);
            return;
        };

        let _ = writeln!(file, "{} -- {}", coordinate, error)
            .inspect_err(|e| warn!("Failed to write error log {:?}: {}", self.path, e));
    }
}
