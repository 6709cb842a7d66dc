pub mod dashboard;
pub mod event;

pub use dashboard::{BlockedSnapshot, DashboardState, UnblockOutcome};
pub use event::{AddressStats, LoginFailureEvent};

use chrono::Utc;

/// Current wall-clock time as fractional seconds since the Unix epoch
pub fn epoch_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
