//! Refbox game controller binary.
//!
//! Wires the match clock, the controller, persistence, and the publish
//! sinks together, then runs until `Ctrl-C` or a fatal persistence error.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `refbox-config.yaml` (or the path given as
//!    the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Open the recovery snapshot and a new audit log
//! 4. Build the publish sinks (live viewers, UDP referee frames)
//! 5. Recover the last state and construct the controller
//! 6. Publish the initial state
//! 7. Start the Observer API server
//! 8. Run the match clock until shutdown

mod error;
mod publisher;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use refbox_core::clock::MatchClock;
use refbox_core::config::{LoggingConfig, RefboxConfig};
use refbox_core::controller::GameController;
use refbox_core::persist::StateStore;
use refbox_core::publish::{FanOut, StateSink};
use refbox_core::rules::BasicRules;
use refbox_core::runner::run_clock;
use refbox_observer::server::spawn_server;
use refbox_observer::state::{AppState, StateHub};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::publisher::UdpPublisher;

const DEFAULT_CONFIG_PATH: &str = "refbox-config.yaml";

/// Application entry point.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, found) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("refbox-engine starting");
    if found {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        warn!(path = %config_path.display(), "Config file not found, using defaults");
    }

    // 3. Open persistence files.
    let store = StateStore::open(
        &config.persistence.log_dir,
        &config.persistence.last_state_file,
        Utc::now(),
    )?;
    info!(
        snapshot = %store.last_state_path().display(),
        audit_log = %store.history_path().display(),
        "Persistence files opened"
    );

    // 4. Build publish sinks.
    let fresh = config.game.initial_state();
    let hub = Arc::new(StateHub::new(fresh.clone()));
    let mut fan_out = FanOut::new().with_sink(Arc::clone(&hub) as Arc<dyn StateSink>);
    match UdpPublisher::bind(&config.publish.address).await {
        Ok((publisher, _send_task)) => {
            info!(address = %publisher.target(), "Referee publisher started");
            fan_out = fan_out.with_sink(Arc::new(publisher));
        }
        Err(e) => {
            // Matches still run without referee frames; viewers still work.
            warn!(
                address = config.publish.address,
                error = %e,
                "Could not start referee publisher"
            );
        }
    }
    info!(sinks = ?fan_out, "Publish sinks ready");

    // 5. Recover state and construct the controller.
    let rules = Arc::new(BasicRules::from_config(&config.game));
    let controller = Arc::new(GameController::recover(
        store,
        config.persistence.max_snapshot_bytes,
        fresh,
        rules,
        fan_out,
    )?);

    // 6. Publish the initial state so sinks do not wait for the first tick.
    controller.publish(None);

    // 7. Start Observer API server.
    let app_state = Arc::new(AppState::new(hub, Some(Arc::clone(&controller))));
    let _observer_handle = spawn_server(config.observer.clone(), app_state);
    info!(
        host = config.observer.host,
        port = config.observer.port,
        "Observer API server started"
    );

    // 8. Run the match clock.
    tokio::select! {
        result = run_clock(controller, MatchClock::start(), None) => {
            let ticks = result?;
            info!(ticks, "Match clock stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
        }
    }

    info!("refbox-engine shutdown complete");
    Ok(())
}

/// Load configuration from `path`.
///
/// Returns the defaults and `false` when the file does not exist.
fn load_config(path: &Path) -> Result<(RefboxConfig, bool), EngineError> {
    if path.exists() {
        Ok((RefboxConfig::from_file(path)?, true))
    } else {
        Ok((RefboxConfig::parse("")?, false))
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
