use serde::Serialize;

/// Aggregated view returned by every tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardState {
    #[serde(rename = "alert")]
    pub alert_message: String,
    #[serde(rename = "total_attacks")]
    pub total_attack_count: u64,
    pub blocked_count: usize,
    #[serde(rename = "active_ips")]
    pub active_address_count: usize,
}

/// Current blocklist membership plus the tail of the audit trail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockedSnapshot {
    /// Sorted ascending
    pub blocked: Vec<String>,
    pub recent: Vec<String>,
}

/// Result of an unblock command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnblockOutcome {
    pub message: String,
    pub blocked_count: usize,
}
