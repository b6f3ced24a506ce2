use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, StorageError, UnitError};
use crate::storage::filesystem::ensure_directory;

/// One recoverable failure, as written to the error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub unit: String,
    pub kind: ErrorKind,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn from_error(unit: &str, error: &UnitError) -> Self {
        Self {
            unit: unit.to_string(),
            kind: error.kind(),
            reason: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only JSON-lines log of error records (`errors.jsonl`).
pub struct ErrorLog {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl ErrorLog {
    pub const FILE_NAME: &'static str = "errors.jsonl";

    pub fn open_in(directory: &Path) -> Result<Self, StorageError> {
        ensure_directory(directory)?;
        let path = directory.join(Self::FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Logging failures are reported, not escalated.
    pub fn append(&mut self, record: &ErrorRecord) {
        let result = serde_json::to_string(record)
            .map_err(std::io::Error::from)
            .and_then(|line| writeln!(self.writer, "{}", line))
            .and_then(|_| self.writer.flush());
        match result {
            Ok(()) => self.written += 1,
            Err(e) => warn!("Failed to append to {}: {}", self.path.display(), e),
        }
    }

    pub fn read_all(path: &Path) -> std::io::Result<Vec<ErrorRecord>> {
        let content = std::fs::read_to_string(path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(std::io::Error::from))
            .collect()
    }
}
