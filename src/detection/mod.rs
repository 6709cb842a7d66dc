pub mod anomaly;
pub mod engine;

pub use anomaly::{AnomalyDetector, AttackKind, Thresholds};
pub use engine::{DetectionEngine, UnblockTarget};
