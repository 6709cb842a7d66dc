//! Threshold rules for brute force detection
//!
//! Two rules decide whether an address should be blocked:
//! a burst of failures inside a short window, or a total failure
//! count that is too high regardless of timing.

use crate::config::DetectionConfig;
use crate::models::AddressStats;
use std::fmt;

/// Detector thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub rapid_count: u32,
    pub rapid_window_seconds: f64,
    pub volume_count: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            rapid_count: 3,
            rapid_window_seconds: 30.0,
            volume_count: 6,
        }
    }
}

impl From<&DetectionConfig> for Thresholds {
    fn from(config: &DetectionConfig) -> Self {
        Thresholds {
            rapid_count: config.rapid_count,
            rapid_window_seconds: config.rapid_window_seconds,
            volume_count: config.volume_count,
        }
    }
}

/// Which rule fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    /// Many failures in a short window
    Rapid,
    /// Too many failures overall
    Volume,
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackKind::Rapid => write!(f, "Rapid attack"),
            AttackKind::Volume => write!(f, "Multiple attempts threshold reached"),
        }
    }
}

/// Stateless rule evaluator over per-address statistics
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    thresholds: Thresholds,
}

impl AnomalyDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        AnomalyDetector { thresholds }
    }

    /// Decide whether the address described by `stats` should be blocked.
    ///
    /// An address with no recorded stats is never blocked.
    pub fn should_block(&self, stats: Option<&AddressStats>, now: f64) -> bool {
        match stats.and_then(|s| self.classify(s, now)) {
            Some(kind) => {
                if let Some(s) = stats {
                    log::debug!(
                        "[detector] {}: {} attempts={} window={:.1}s",
                        kind,
                        s.address,
                        s.failure_count,
                        s.window_age(now)
                    );
                }
                true
            }
            None => false,
        }
    }

    /// The first rule that matches, rapid before volume
    pub fn classify(&self, stats: &AddressStats, now: f64) -> Option<AttackKind> {
        let t = &self.thresholds;
        if stats.failure_count >= t.rapid_count && stats.window_age(now) <= t.rapid_window_seconds {
            return Some(AttackKind::Rapid);
        }
        if stats.failure_count >= t.volume_count {
            return Some(AttackKind::Volume);
        }
        None
    }
}
