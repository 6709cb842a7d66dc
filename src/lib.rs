pub mod blocklist;
pub mod config;
pub mod detection;
pub mod input;
pub mod models;
pub mod server;

// Re-export commonly used types
pub use blocklist::{AuditSink, Blocklist, FileAuditLog, MemoryAuditLog};
pub use config::{Config, ConfigError};
pub use detection::{AnomalyDetector, DetectionEngine, Thresholds, UnblockTarget};
pub use input::{EventParser, LogSimulator, OffsetTailReader};
pub use models::{AddressStats, BlockedSnapshot, DashboardState, LoginFailureEvent, UnblockOutcome};
