use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use structopt::StructOpt;

use authwatch::blocklist::FileAuditLog;
use authwatch::config::Config;
use authwatch::detection::DetectionEngine;
use authwatch::input::{EventParser, LogSimulator};
use authwatch::models::epoch_seconds;

/// Authwatch intrusion dashboard command line interface
#[derive(StructOpt, Debug)]
#[structopt(name = "authwatch", about = "Log-tailing intrusion dashboard CLI")]
pub enum Cli {
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Parse and display login failures from a log file
    Parse {
        /// Path to log file
        #[structopt(short, long)]
        file: PathBuf,
        /// Number of events to show
        #[structopt(short, long, default_value = "10")]
        lines: usize,
        /// Event tag marking a login failure
        #[structopt(long, default_value = "cowrie.login.failed")]
        marker: String,
    },
    /// Append synthetic failed logins to the configured log
    Simulate {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Source address of the attempts
        #[structopt(long, default_value = "192.168.1.100")]
        ip: String,
        /// Number of attempts
        #[structopt(short, default_value = "3")]
        n: usize,
    },
    /// Tick the detector periodically and print the dashboard
    Watch {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Seconds between ticks
        #[structopt(short, long, default_value = "2")]
        interval: u64,
    },
}

fn load_config(path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        Config::from_file(path)?
    } else {
        eprintln!("Configuration file not found: {:?}, using defaults", path);
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::from_args();

    match cli {
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Parse { file, lines, marker } => {
            if !file.exists() {
                eprintln!("File not found: {:?}", file);
                std::process::exit(1);
            }

            let parser = EventParser::new(marker);
            let contents = std::fs::read_to_string(&file)?;
            let mut events = Vec::new();
            let mut ignored = 0;
            let mut malformed = 0;
            for line in contents.lines() {
                match parser.parse(line) {
                    Ok(Some(event)) => events.push(event),
                    Ok(None) => ignored += 1,
                    Err(_) => malformed += 1,
                }
            }

            let display_count = std::cmp::min(lines, events.len());
            println!(
                "Parsed {} login failure(s), {} other line(s), {} malformed (showing {}):\n",
                events.len(),
                ignored,
                malformed,
                display_count
            );
            for event in events.iter().take(display_count) {
                println!(
                    "  IP: {}, User: {}, Password: {}, Timestamp: {}",
                    event.source_address, event.username, event.password, event.timestamp
                );
            }
        }
        Cli::Simulate { config, ip, n } => {
            let config = load_config(&config)?;
            let simulator = LogSimulator::new(config.input.log_path.clone(), config.input.event_marker);
            let delay = Duration::from_millis(config.server.simulate_delay_ms);
            let written = simulator.append_attempts(&ip, n, delay);
            println!(
                "Simulated {} failed login attempts from {} into {:?}",
                written,
                ip,
                simulator.log_path()
            );
        }
        Cli::Watch { config, interval } => {
            let config = load_config(&config)?;

            // Setup graceful shutdown signal handling
            let running = Arc::new(AtomicBool::new(true));
            let r = running.clone();
            ctrlc::set_handler(move || {
                r.store(false, Ordering::SeqCst);
            })?;

            let audit = Arc::new(FileAuditLog::new(&config.output.audit_path));
            let mut engine = DetectionEngine::new(&config, audit, epoch_seconds());
            println!("Watching {:?}. Press Ctrl+C to stop.", config.input.log_path);

            let mut last = None;
            while running.load(Ordering::SeqCst) {
                let state = engine.tick(epoch_seconds());
                if last.as_ref() != Some(&state) {
                    println!(
                        "[{}] attacks={} blocked={} active={}",
                        state.alert_message,
                        state.total_attack_count,
                        state.blocked_count,
                        state.active_address_count
                    );
                    last = Some(state);
                }
                std::thread::sleep(Duration::from_secs(interval.max(1)));
            }
            println!("Stopped watching");
        }
    }

    Ok(())
}
