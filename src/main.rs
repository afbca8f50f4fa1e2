//! # Dogbot Teleop
//!
//! Teleoperate a quadruped robot over its HTTP control interface.
//!
//! The client polls the robot's IMU, battery and servo endpoints, checks that
//! the robot is reachable, and forwards keyboard and gamepad input. A status
//! report is logged once a second; robot addresses typed on stdin switch the
//! target at runtime.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use dogbot_teleop::config::{Config, LoggingConfig};
use dogbot_teleop::dashboard::input::{run_address_input, spawn_stdin_lines};
use dogbot_teleop::dashboard::{Dashboard, TargetControl};
use dogbot_teleop::robot::{HttpRobotClient, RobotApi};
use dogbot_teleop::state::Store;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log file name prefix inside `[logging].log_dir`
const LOG_FILE_PREFIX: &str = "dogbot-teleop.log";

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "dogbot-teleop", version, about)]
struct Args {
    /// Configuration file; built-in defaults are used if it does not exist
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Robot address (host or host:port), overrides `[robot].address`
    #[arg(short, long)]
    address: Option<String>,
}

/// Main entry point for Dogbot Teleop
///
/// # Control Flow
///
/// 1. Load configuration and apply command-line overrides
/// 2. Set up logging (stdout, plus daily log files if configured)
/// 3. Start the dashboard tasks and the stdin address reader
/// 4. Wait for Ctrl+C, then cancel every task and wait for them to stop
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(address) = args.address {
        config.robot.address = address;
        config.validate()?;
    }

    let _log_guard = init_logging(&config.logging);

    info!("Dogbot Teleop v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", args.config.display());
    for (index, url) in config.cameras.streams.iter().enumerate() {
        info!("Camera {} stream: {}", index + 1, url);
    }

    let store = Store::default();
    let targets = TargetControl::new(store.clone(), &config.robot.address);
    let client = HttpRobotClient::from_config(&config.robot, targets.subscribe())?;
    let api: Arc<dyn RobotApi> = Arc::new(client);

    let mut dashboard = Dashboard::spawn(&config, api, store, &targets)?;

    match spawn_stdin_lines() {
        Ok(lines) => {
            let task = tokio::spawn(run_address_input(lines, targets.clone(), dashboard.cancellation_token()));
            dashboard.add("address-input", task);
        }
        Err(e) => warn!("Address input unavailable: {}", e),
    }

    if targets.current().is_empty() {
        info!("Type the robot's IP address and press Enter");
    }
    info!("Press Ctrl+C to exit");

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");
    dashboard.shutdown().await;

    Ok(())
}

/// Installs the global subscriber.
///
/// Returns the file writer guard when file logging is enabled; it must live
/// until exit so buffered lines are flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let (file_layer, guard) = if config.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}
