//! Audit trail backends

use super::{AuditError, AuditSink};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only text file, one record per line
pub struct FileAuditLog {
    path: PathBuf,
}

impl FileAuditLog {
    /// Use the file at `path`; existing history is kept
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileAuditLog {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl AuditSink for FileAuditLog {
    fn append(&self, record: &str) -> Result<(), AuditError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", record)?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<String>, AuditError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        let skip = lines.len().saturating_sub(limit);
        Ok(lines.split_off(skip))
    }
}

/// In-memory audit trail, used in tests and when no file is wanted
#[derive(Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<String>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record appended so far
    pub fn records(&self) -> Vec<String> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, record: &str) -> Result<(), AuditError> {
        let mut records = self.records.lock().map_err(|_| AuditError::Poisoned)?;
        records.push(record.to_string());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<String>, AuditError> {
        let records = self.records.lock().map_err(|_| AuditError::Poisoned)?;
        let skip = records.len().saturating_sub(limit);
        Ok(records[skip..].to_vec())
    }
}
