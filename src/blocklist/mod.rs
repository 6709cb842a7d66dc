//! Blocked source addresses and their audit trail
//!
//! Membership lives in memory and starts empty on every launch. Every
//! transition is also written to an [`AuditSink`], which is the only
//! history that outlives the process.

pub mod audit;

pub use audit::{FileAuditLog, MemoryAuditLog};

use chrono::{DateTime, Local, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while writing or reading the audit trail
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit log lock poisoned")]
    Poisoned,
}

/// Destination for block/unblock records
///
/// Records are human-readable lines; the blocklist never reads them back
/// except to show recent history. Addresses come from the input stream,
/// so they are escaped before being written and a record never spans
/// more than one line.
pub trait AuditSink: Send + Sync {
    /// Append one record
    fn append(&self, record: &str) -> Result<(), AuditError>;

    /// The last `limit` records, oldest first
    fn recent(&self, limit: usize) -> Result<Vec<String>, AuditError>;
}

/// One blocked address
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntry {
    pub address: String,
    pub blocked_at_attempt_count: u32,
    pub blocked_at: f64,
}

pub struct Blocklist {
    entries: BTreeMap<String, BlockEntry>,
    audit: Arc<dyn AuditSink>,
}

impl Blocklist {
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Blocklist {
            entries: BTreeMap::new(),
            audit,
        }
    }

    /// Block `address`. Returns false, and records nothing, if it was
    /// already blocked.
    pub fn block(&mut self, address: &str, attempt_count: u32, now: f64) -> bool {
        if self.entries.contains_key(address) {
            return false;
        }
        self.entries.insert(
            address.to_string(),
            BlockEntry {
                address: address.to_string(),
                blocked_at_attempt_count: attempt_count,
                blocked_at: now,
            },
        );
        self.record(&format!(
            "INTRUSION: IP {} blocked after {} failed attempts - {}",
            address.escape_debug(),
            attempt_count,
            clock_time(now)
        ));
        true
    }

    /// Remove `address`. Returns whether it was blocked; an address that
    /// was not blocked is left alone and nothing is recorded.
    pub fn unblock(&mut self, address: &str, now: f64) -> bool {
        if self.entries.remove(address).is_none() {
            return false;
        }
        log::info!("Unblocked {}", address.escape_debug());
        self.record(&format!(
            "Unblocked {} - {}",
            address.escape_debug(),
            clock_time(now)
        ));
        true
    }

    /// Remove every entry, recording a single summary line. Returns how
    /// many addresses were released.
    pub fn unblock_all(&mut self, now: f64) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        log::info!("Cleared all blocks ({} addresses)", cleared);
        self.record(&format!("Cleared all blocks - {}", clock_time(now)));
        cleared
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    pub fn get(&self, address: &str) -> Option<&BlockEntry> {
        self.entries.get(address)
    }

    /// Blocked addresses in ascending order
    pub fn list(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last `limit` audit records, oldest first. Unreadable history is
    /// logged and reported as empty.
    pub fn recent_events(&self, limit: usize) -> Vec<String> {
        match self.audit.recent(limit) {
            Ok(records) => records,
            Err(e) => {
                log::error!("Failed to read audit trail: {}", e);
                Vec::new()
            }
        }
    }

    fn record(&self, line: &str) {
        if let Err(e) = self.audit.append(line) {
            log::error!("Failed to write audit record: {}", e);
        }
    }
}

/// Local wall-clock `HH:MM:SS` for an epoch timestamp
fn clock_time(epoch_seconds: f64) -> String {
    let secs = epoch_seconds.floor();
    let nanos = ((epoch_seconds - secs) * 1e9) as u32;
    match DateTime::<Utc>::from_timestamp(secs as i64, nanos) {
        Some(utc) => utc.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    }
}
