//! HTTP query interface
//!
//! Thin JSON routes over a single shared [`DetectionEngine`]. Every
//! route that reports state runs a tick first, under the engine lock.

use crate::config::{Config, ServerConfig};
use crate::detection::{DetectionEngine, UnblockTarget};
use crate::input::LogSimulator;
use crate::models::epoch_seconds;
use actix_web::{error, middleware, web, App, HttpResponse, HttpServer};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Shared state handed to every request
pub struct AppState {
    engine: Mutex<DetectionEngine>,
    simulator: LogSimulator,
    settings: ServerConfig,
}

impl AppState {
    pub fn new(engine: DetectionEngine, config: &Config) -> Self {
        AppState {
            engine: Mutex::new(engine),
            simulator: LogSimulator::new(
                config.input.log_path.clone(),
                config.input.event_marker.clone(),
            ),
            settings: config.server.clone(),
        }
    }

    fn engine(&self) -> Result<MutexGuard<'_, DetectionEngine>, actix_web::Error> {
        self.engine
            .lock()
            .map_err(|_| error::ErrorInternalServerError("detection engine unavailable"))
    }
}

#[derive(Debug, Deserialize)]
pub struct UnblockQuery {
    pub ip: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SimulateQuery {
    pub ip: Option<String>,
    /// Kept as text so a bad value falls back to the default count
    pub n: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnblockResponse {
    pub status: String,
    pub message: String,
    pub blocked_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimulateResponse {
    pub status: String,
    pub ip: String,
    pub attempts_written: usize,
    pub message: String,
    pub total_attacks: u64,
    pub blocked_count: usize,
}

/// Register the query routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/status", web::get().to(status))
        .route("/blocked", web::get().to(blocked))
        .route("/unblock", web::get().to(unblock))
        .route("/simulate", web::get().to(simulate));
}

async fn status(state: web::Data<AppState>) -> Result<HttpResponse, actix_web::Error> {
    let dashboard = state.engine()?.tick(epoch_seconds());
    Ok(HttpResponse::Ok().json(dashboard))
}

async fn blocked(state: web::Data<AppState>) -> Result<HttpResponse, actix_web::Error> {
    let snapshot = state.engine()?.blocked_list(epoch_seconds());
    Ok(HttpResponse::Ok().json(snapshot))
}

async fn unblock(
    state: web::Data<AppState>,
    query: web::Query<UnblockQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let target = match query.into_inner().ip.filter(|ip| !ip.is_empty()) {
        Some(ip) => UnblockTarget::One(ip),
        None => UnblockTarget::All,
    };
    let outcome = state.engine()?.unblock(target, epoch_seconds());
    Ok(HttpResponse::Ok().json(UnblockResponse {
        status: "ok".to_string(),
        message: outcome.message,
        blocked_count: outcome.blocked_count,
    }))
}

async fn simulate(
    state: web::Data<AppState>,
    query: web::Query<SimulateQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let query = query.into_inner();
    let settings = &state.settings;
    let ip = query
        .ip
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| settings.default_simulate_ip.clone());
    let count = query
        .n
        .and_then(|n| n.trim().parse::<usize>().ok())
        .unwrap_or(settings.default_simulate_count);

    state.engine()?.set_alert(format!(
        "Simulating {} failed login attempts from {}...",
        count, ip
    ));

    let delay = Duration::from_millis(settings.simulate_delay_ms);
    let written = state.simulator.append_attempts_async(&ip, count, delay).await;
    log::info!("Simulated {} failed login attempts from {}", written, ip);

    let dashboard = state.engine()?.tick(epoch_seconds());
    Ok(HttpResponse::Ok().json(SimulateResponse {
        status: "simulated".to_string(),
        message: format!("Simulated {} failed login attempts from {}", written, ip),
        ip,
        attempts_written: written,
        total_attacks: dashboard.total_attack_count,
        blocked_count: dashboard.blocked_count,
    }))
}

/// Serve the query interface until the process is interrupted
pub async fn run(state: AppState) -> std::io::Result<()> {
    let host = state.settings.host.clone();
    let port = state.settings.port;
    let data = web::Data::new(state);

    log::info!("Serving dashboard API on http://{}:{}", host, port);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(data.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run()
    .await
}
