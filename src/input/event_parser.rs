//! Parser for login-failure records
//!
//! Each input line is a JSON object. Lines that do not carry the
//! configured event marker are skipped without being decoded.

use crate::models::event::UNKNOWN_ADDRESS;
use crate::models::LoginFailureEvent;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors for lines that carry the marker but cannot be decoded
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed JSON record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record is not a JSON object")]
    NotAnObject,
}

/// Parses raw log lines into login-failure events
#[derive(Debug, Clone)]
pub struct EventParser {
    marker: String,
}

impl EventParser {
    pub fn new(marker: impl Into<String>) -> Self {
        EventParser {
            marker: marker.into(),
        }
    }

    /// Parse one raw line.
    ///
    /// Returns `Ok(None)` when the line is not a login-failure record,
    /// `Err` when it is one but fails to decode.
    pub fn parse(&self, raw_line: &str) -> Result<Option<LoginFailureEvent>, ParseError> {
        let line = raw_line.trim();
        if line.is_empty() || !line.contains(&self.marker) {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(line)?;
        let record = value.as_object().ok_or(ParseError::NotAnObject)?;

        Ok(Some(LoginFailureEvent {
            source_address: string_field(record, "src_ip")
                .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string()),
            timestamp: record
                .get("timestamp")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            username: string_field(record, "username").unwrap_or_default(),
            password: string_field(record, "password").unwrap_or_default(),
        }))
    }
}

fn string_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}
