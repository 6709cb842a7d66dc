use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use authwatch::blocklist::FileAuditLog;
use authwatch::config::Config;
use authwatch::detection::DetectionEngine;
use authwatch::models::epoch_seconds;
use authwatch::server::{self, AppState};

/// Daemon entry point: serves the dashboard query interface
#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting authwatch daemon...");

    // Load configuration
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        log::warn!("Config file not found, using defaults");
        Config::default()
    };
    config.validate()?;

    // Records stamped before this moment are leftovers from an earlier run
    let startup_epoch = epoch_seconds();
    let audit = Arc::new(FileAuditLog::new(&config.output.audit_path));
    let engine = DetectionEngine::new(&config, audit, startup_epoch);

    log::info!("Tailing log file: {:?}", config.input.log_path);
    log::info!("Audit trail: {:?}", config.output.audit_path);
    log::info!(
        "Thresholds: {} failures in {}s, or {} failures total",
        config.detection.rapid_count,
        config.detection.rapid_window_seconds,
        config.detection.volume_count
    );

    server::run(AppState::new(engine, &config)).await?;

    log::info!("authwatch daemon stopped");
    Ok(())
}
