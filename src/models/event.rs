use serde::{Deserialize, Serialize};

/// Source address recorded when a record carries none
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// A single failed login parsed from the input stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginFailureEvent {
    pub source_address: String,
    /// Seconds since the Unix epoch, 0 when the record had none
    pub timestamp: f64,
    pub username: String,
    pub password: String,
}

/// Accumulated failure statistics for one source address
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressStats {
    pub address: String,
    pub failure_count: u32,
    /// When the first failure of the current observation window was seen
    pub window_start: f64,
    pub last_seen: f64,
}

impl AddressStats {
    /// Stats for an address sighted for the first time at `now`
    pub fn first_sighting(address: &str, now: f64) -> Self {
        AddressStats {
            address: address.to_string(),
            failure_count: 0,
            window_start: now,
            last_seen: now,
        }
    }

    /// Count one more failure observed at `now`
    pub fn record_failure(&mut self, now: f64) {
        self.failure_count += 1;
        self.last_seen = now;
    }

    /// Seconds elapsed since the window opened
    pub fn window_age(&self, now: f64) -> f64 {
        now - self.window_start
    }

    pub fn is_active(&self, now: f64, active_window_seconds: f64) -> bool {
        now - self.last_seen < active_window_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sighting_starts_empty() {
        let stats = AddressStats::first_sighting("10.0.0.5", 1000.0);
        assert_eq!(stats.failure_count, 0);
        assert_eq!(stats.window_start, 1000.0);
        assert_eq!(stats.last_seen, 1000.0);
    }

    #[test]
    fn test_record_failure_keeps_window_start() {
        let mut stats = AddressStats::first_sighting("10.0.0.5", 1000.0);
        stats.record_failure(1000.0);
        stats.record_failure(1012.5);

        assert_eq!(stats.failure_count, 2);
        assert_eq!(stats.window_start, 1000.0);
        assert_eq!(stats.last_seen, 1012.5);
        assert_eq!(stats.window_age(1020.0), 20.0);
    }

    #[test]
    fn test_active_view_boundary() {
        let mut stats = AddressStats::first_sighting("10.0.0.5", 1000.0);
        stats.record_failure(1000.0);

        assert!(stats.is_active(1299.0, 300.0));
        assert!(!stats.is_active(1300.0, 300.0));
    }
}
