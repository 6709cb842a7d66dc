//! Pull-based detection pipeline
//!
//! Every query runs one tick: read newly appended log lines, parse the
//! login failures, update per-address statistics, and block addresses
//! that cross a threshold. There is no background loop; callers that
//! share an engine across threads must serialize ticks behind one lock.

use crate::blocklist::{AuditSink, Blocklist};
use crate::config::Config;
use crate::detection::anomaly::{AnomalyDetector, Thresholds};
use crate::input::{EventParser, OffsetTailReader, ParseError};
use crate::models::{AddressStats, BlockedSnapshot, DashboardState, LoginFailureEvent, UnblockOutcome};
use std::collections::HashMap;
use std::sync::Arc;

pub const INITIAL_ALERT: &str = "Monitoring for intrusions...";

/// Which addresses an unblock command releases
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnblockTarget {
    One(String),
    All,
}

/// What happened to a single input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOutcome {
    Ignored,
    Stale,
    Counted,
    Blocked,
}

/// Owns all mutable detection state
pub struct DetectionEngine {
    reader: OffsetTailReader,
    parser: EventParser,
    detector: AnomalyDetector,
    stats: HashMap<String, AddressStats>,
    blocklist: Blocklist,
    alert: String,
    total_attacks: u64,
    /// Records stamped before this are left over from a previous run
    startup_epoch: f64,
    active_window_seconds: f64,
    recent_events: usize,
}

impl DetectionEngine {
    /// Build an engine with empty state, reading the configured log from
    /// byte 0 and ignoring records older than `startup_epoch`
    pub fn new(config: &Config, audit: Arc<dyn AuditSink>, startup_epoch: f64) -> Self {
        DetectionEngine {
            reader: OffsetTailReader::new(config.input.log_path.clone()),
            parser: EventParser::new(config.input.event_marker.clone()),
            detector: AnomalyDetector::new(Thresholds::from(&config.detection)),
            stats: HashMap::new(),
            blocklist: Blocklist::new(audit),
            alert: INITIAL_ALERT.to_string(),
            total_attacks: 0,
            startup_epoch,
            active_window_seconds: config.detection.active_window_seconds,
            recent_events: config.output.recent_events,
        }
    }

    /// Consume new log content and return the current dashboard
    pub fn tick(&mut self, now: f64) -> DashboardState {
        let lines = self.reader.poll();

        let (mut ignored, mut stale, mut counted, mut blocked, mut malformed) = (0, 0, 0, 0, 0);
        for line in &lines {
            match self.process_line(line, now) {
                Ok(LineOutcome::Ignored) => ignored += 1,
                Ok(LineOutcome::Stale) => stale += 1,
                Ok(LineOutcome::Counted) => counted += 1,
                Ok(LineOutcome::Blocked) => blocked += 1,
                Err(e) => {
                    log::debug!("Skipping malformed record: {}", e);
                    malformed += 1;
                }
            }
        }
        if !lines.is_empty() {
            log::debug!(
                "Tick: {} counted, {} blocked, {} stale, {} ignored, {} malformed",
                counted,
                blocked,
                stale,
                ignored,
                malformed
            );
        }

        self.dashboard(now)
    }

    fn process_line(&mut self, line: &str, now: f64) -> Result<LineOutcome, ParseError> {
        match self.parser.parse(line)? {
            None => Ok(LineOutcome::Ignored),
            Some(event) if event.timestamp < self.startup_epoch => Ok(LineOutcome::Stale),
            Some(event) => Ok(self.record_failure(&event, now)),
        }
    }

    fn record_failure(&mut self, event: &LoginFailureEvent, now: f64) -> LineOutcome {
        let address = event.source_address.as_str();
        let stats = self
            .stats
            .entry(address.to_string())
            .or_insert_with(|| AddressStats::first_sighting(address, now));
        stats.record_failure(now);
        let failures = stats.failure_count;

        if self.blocklist.contains(address)
            || !self.detector.should_block(self.stats.get(address), now)
        {
            return LineOutcome::Counted;
        }

        self.total_attacks += 1;
        self.blocklist.block(address, failures, now);
        self.alert = format!(
            "INTRUSION DETECTED! Attack #{}: {} ({} failed attempts)",
            self.total_attacks, address, failures
        );
        log::warn!(
            "INTRUSION DETECTED! Blocked {} after {} failed attempts (user '{}')",
            address.escape_debug(),
            failures,
            event.username.escape_debug()
        );
        LineOutcome::Blocked
    }

    /// Aggregate state without reading the log
    pub fn dashboard(&self, now: f64) -> DashboardState {
        DashboardState {
            alert_message: self.alert.clone(),
            total_attack_count: self.total_attacks,
            blocked_count: self.blocklist.len(),
            active_address_count: self.active_address_count(now),
        }
    }

    /// Addresses seen within the active window. Older stats are kept for
    /// counting and only filtered out here.
    pub fn active_address_count(&self, now: f64) -> usize {
        self.stats
            .values()
            .filter(|s| s.is_active(now, self.active_window_seconds))
            .count()
    }

    /// Blocked addresses and recent audit history, after a tick
    pub fn blocked_list(&mut self, now: f64) -> BlockedSnapshot {
        self.tick(now);
        BlockedSnapshot {
            blocked: self.blocklist.list(),
            recent: self.blocklist.recent_events(self.recent_events),
        }
    }

    /// Release one address or all of them. Releasing an address that is
    /// not blocked succeeds and changes nothing.
    pub fn unblock(&mut self, target: UnblockTarget, now: f64) -> UnblockOutcome {
        match target {
            UnblockTarget::One(address) => {
                if self.blocklist.unblock(&address, now) {
                    self.alert = format!("Unblocked {}", address);
                }
            }
            UnblockTarget::All => {
                self.blocklist.unblock_all(now);
                self.alert = "Cleared all blocked IPs".to_string();
            }
        }
        UnblockOutcome {
            message: self.alert.clone(),
            blocked_count: self.blocklist.len(),
        }
    }

    /// Replace the alert banner, e.g. while a simulation is running
    pub fn set_alert(&mut self, message: impl Into<String>) {
        self.alert = message.into();
    }

    pub fn address_stats(&self, address: &str) -> Option<&AddressStats> {
        self.stats.get(address)
    }

    pub fn read_offset(&self) -> u64 {
        self.reader.offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocklist::MemoryAuditLog;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::path::Path;

    const EPOCH: f64 = 1_700_000_000.0;

    fn failure(ip: &str, ts: f64) -> String {
        format!(
            r#"{{"eventid": "cowrie.login.failed", "src_ip": "{}", "timestamp": {}, "username": "root", "password": "x"}}"#,
            ip, ts
        )
    }

    fn append(path: &Path, lines: &[String]) {
        let mut f = OpenOptions::new().create(true).append(true).open(path).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
    }

    fn engine(dir: &tempfile::TempDir) -> (DetectionEngine, Arc<MemoryAuditLog>, std::path::PathBuf) {
        let path = dir.path().join("cowrie.json");
        let mut config = Config::default();
        config.input.log_path = path.clone();
        let audit = Arc::new(MemoryAuditLog::new());
        (DetectionEngine::new(&config, audit.clone(), EPOCH), audit, path)
    }

    #[test]
    fn test_initial_state() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _, _) = engine(&dir);

        let state = engine.tick(EPOCH);
        assert_eq!(state.alert_message, INITIAL_ALERT);
        assert_eq!(state.total_attack_count, 0);
        assert_eq!(state.blocked_count, 0);
        assert_eq!(state.active_address_count, 0);
    }

    #[test]
    fn test_rapid_attack_blocks_once() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, audit, path) = engine(&dir);

        let lines: Vec<_> = (0..3).map(|i| failure("10.0.0.5", EPOCH + i as f64)).collect();
        append(&path, &lines);

        let state = engine.tick(EPOCH + 5.0);
        assert_eq!(state.total_attack_count, 1);
        assert_eq!(state.blocked_count, 1);
        assert!(state.alert_message.contains("10.0.0.5"));
        assert!(state.alert_message.contains("3 failed attempts"));
        assert_eq!(audit.records().len(), 1);

        // More failures from a blocked address do not raise new attacks
        append(&path, &[failure("10.0.0.5", EPOCH + 6.0)]);
        let state = engine.tick(EPOCH + 6.0);
        assert_eq!(state.total_attack_count, 1);
        assert_eq!(audit.records().len(), 1);
        assert_eq!(engine.address_stats("10.0.0.5").unwrap().failure_count, 4);
    }

    #[test]
    fn test_repeated_tick_without_data_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _, path) = engine(&dir);
        append(&path, &[failure("10.0.0.5", EPOCH + 1.0)]);

        let first = engine.tick(EPOCH + 2.0);
        let second = engine.tick(EPOCH + 2.0);
        assert_eq!(first, second);
        assert_eq!(engine.address_stats("10.0.0.5").unwrap().failure_count, 1);
    }

    #[test]
    fn test_stale_records_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _, path) = engine(&dir);

        let stale: Vec<_> = (0..6).map(|i| failure("10.0.0.7", EPOCH - 100.0 + i as f64)).collect();
        append(&path, &stale);

        let state = engine.tick(EPOCH + 1.0);
        assert_eq!(state.total_attack_count, 0);
        assert!(engine.address_stats("10.0.0.7").is_none());
    }

    #[test]
    fn test_bad_lines_do_not_stop_tick() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _, path) = engine(&dir);

        append(
            &path,
            &[
                failure("10.0.0.5", EPOCH + 1.0),
                r#"{"eventid": "cowrie.login.failed", "src_ip": "#.to_string(),
                r#"{"eventid": "cowrie.session.connect", "src_ip": "10.0.0.5"}"#.to_string(),
                "not json".to_string(),
                failure("10.0.0.5", EPOCH + 2.0),
                failure("10.0.0.5", EPOCH + 3.0),
            ],
        );

        let state = engine.tick(EPOCH + 4.0);
        assert_eq!(state.blocked_count, 1);
        assert_eq!(engine.address_stats("10.0.0.5").unwrap().failure_count, 3);
    }

    #[test]
    fn test_window_starts_at_first_sighting() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _, path) = engine(&dir);

        append(&path, &[failure("10.0.0.8", EPOCH + 1.0), failure("10.0.0.8", EPOCH + 2.0)]);
        engine.tick(EPOCH + 10.0);

        // Third failure lands after the rapid window has closed
        append(&path, &[failure("10.0.0.8", EPOCH + 50.0)]);
        let state = engine.tick(EPOCH + 50.0);
        assert_eq!(state.blocked_count, 0);

        let stats = engine.address_stats("10.0.0.8").unwrap();
        assert_eq!(stats.window_start, EPOCH + 10.0);
        assert_eq!(stats.last_seen, EPOCH + 50.0);

        // Volume rule catches it eventually
        let more: Vec<_> = (0..3).map(|i| failure("10.0.0.8", EPOCH + 60.0 + i as f64)).collect();
        append(&path, &more);
        let state = engine.tick(EPOCH + 100.0);
        assert_eq!(state.blocked_count, 1);
        assert!(state.alert_message.contains("6 failed attempts"));
    }

    #[test]
    fn test_active_view_expires() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _, path) = engine(&dir);
        append(&path, &[failure("10.0.0.5", EPOCH + 1.0), failure("10.0.0.6", EPOCH + 1.0)]);

        assert_eq!(engine.tick(EPOCH + 1.0).active_address_count, 2);
        assert_eq!(engine.tick(EPOCH + 400.0).active_address_count, 0);
        // Stats are kept even when inactive
        assert!(engine.address_stats("10.0.0.5").is_some());
    }

    #[test]
    fn test_unblock_commands() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, audit, path) = engine(&dir);
        let lines: Vec<_> = (0..3).map(|i| failure("10.0.0.5", EPOCH + i as f64)).collect();
        append(&path, &lines);
        engine.tick(EPOCH + 3.0);

        let outcome = engine.unblock(UnblockTarget::One("192.168.9.9".to_string()), EPOCH + 4.0);
        assert_eq!(outcome.blocked_count, 1);
        assert_eq!(audit.records().len(), 1);

        let outcome = engine.unblock(UnblockTarget::One("10.0.0.5".to_string()), EPOCH + 5.0);
        assert_eq!(outcome.blocked_count, 0);
        assert_eq!(outcome.message, "Unblocked 10.0.0.5");

        let outcome = engine.unblock(UnblockTarget::All, EPOCH + 6.0);
        assert_eq!(outcome.message, "Cleared all blocked IPs");
        assert_eq!(audit.records().len(), 3);
    }

    #[test]
    fn test_blocked_list_reads_new_data_first() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _, path) = engine(&dir);

        append(&path, &(0..3).map(|i| failure("10.0.0.9", EPOCH + i as f64)).collect::<Vec<_>>());
        append(&path, &(0..3).map(|i| failure("10.0.0.1", EPOCH + i as f64)).collect::<Vec<_>>());

        let snapshot = engine.blocked_list(EPOCH + 5.0);
        assert_eq!(snapshot.blocked, vec!["10.0.0.1", "10.0.0.9"]);
        assert_eq!(snapshot.recent.len(), 2);
    }

    #[test]
    fn test_unreadable_log_keeps_previous_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _, path) = engine(&dir);
        append(&path, &(0..3).map(|i| failure("10.0.0.5", EPOCH + i as f64)).collect::<Vec<_>>());
        let before = engine.tick(EPOCH + 3.0);
        assert_eq!(before.blocked_count, 1);

        // The log path now names something that cannot be read as a file
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert_eq!(engine.tick(EPOCH + 3.0), before);
        assert_eq!(engine.tick(EPOCH + 3.0), before);
        assert_eq!(engine.address_stats("10.0.0.5").unwrap().failure_count, 3);
    }

    #[test]
    fn test_forged_address_writes_one_audit_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cowrie.json");
        let mut config = Config::default();
        config.input.log_path = path.clone();
        let audit = Arc::new(crate::blocklist::FileAuditLog::new(dir.path().join("blocked_ips.txt")));
        let mut engine = DetectionEngine::new(&config, audit, EPOCH);

        let forged = r#"6.6.6.6\nUnblocked 10.0.0.1 - 00:00:00"#;
        append(&path, &(0..3).map(|i| failure(forged, EPOCH + i as f64)).collect::<Vec<_>>());

        let snapshot = engine.blocked_list(EPOCH + 3.0);
        assert_eq!(snapshot.blocked, vec!["6.6.6.6\nUnblocked 10.0.0.1 - 00:00:00"]);
        assert_eq!(snapshot.recent.len(), 1);
        assert!(snapshot.recent[0].contains("blocked after 3 failed attempts"));
    }

    #[test]
    fn test_missing_log_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _, _) = engine(&dir);

        for _ in 0..3 {
            assert_eq!(engine.tick(EPOCH).total_attack_count, 0);
        }
        assert_eq!(engine.read_offset(), 0);
    }
}
