//! Synthetic failed-login generator for demos and testing
//!
//! Writes records in the same shape the honeypot produces, so they flow
//! through the normal tail and parse path.

use super::TailError;
use crate::models::epoch_seconds;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const USERNAMES: [&str; 4] = ["admin", "root", "administrator", "system"];
const PASSWORDS: [&str; 4] = ["password123", "admin123", "123456", "root"];

/// Appends synthetic login failures to the input log
#[derive(Debug, Clone)]
pub struct LogSimulator {
    log_path: PathBuf,
    marker: String,
}

impl LogSimulator {
    pub fn new(log_path: PathBuf, marker: impl Into<String>) -> Self {
        LogSimulator {
            log_path,
            marker: marker.into(),
        }
    }

    /// Build the JSON line for the `index`-th attempt from `ip`
    pub fn record(&self, ip: &str, index: usize, timestamp: f64) -> String {
        let username = USERNAMES[index % USERNAMES.len()];
        let password = PASSWORDS[index % PASSWORDS.len()];
        json!({
            "eventid": self.marker,
            "src_ip": ip,
            "timestamp": timestamp,
            "username": username,
            "password": password,
            "message": format!("Login failed: {}/{}", username, password),
        })
        .to_string()
    }

    /// Append a single attempt stamped with the current time
    pub fn append_attempt(&self, ip: &str, index: usize) -> Result<(), TailError> {
        if let Some(parent) = self.log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        let line = self.record(ip, index, epoch_seconds());
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Append `count` attempts, sleeping `delay` between them.
    ///
    /// Returns how many records were written; stops at the first failure.
    pub fn append_attempts(&self, ip: &str, count: usize, delay: Duration) -> usize {
        for i in 0..count {
            if let Err(e) = self.append_attempt(ip, i) {
                log::error!("Error writing simulated log: {}", e);
                return i;
            }
            if i + 1 < count && !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
        count
    }

    /// Async variant of [`append_attempts`](Self::append_attempts) for use
    /// inside request handlers
    pub async fn append_attempts_async(&self, ip: &str, count: usize, delay: Duration) -> usize {
        for i in 0..count {
            if let Err(e) = self.append_attempt(ip, i) {
                log::error!("Error writing simulated log: {}", e);
                return i;
            }
            if i + 1 < count && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        count
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}
