//! Vehicle telemetry producer - Main Entry Point
//!
//! Connects to the configured MQTT broker and publishes a synthetic vehicle
//! sample every interval until interrupted.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use telemetry_producer::config::ConnectionSettings;
use telemetry_producer::observability::init_logging_with_verbosity;
use telemetry_producer::producer::{ProducerOptions, RunOutcome, TelemetryProducer};
use telemetry_producer::transport::mqtt::MqttTelemetryClient;
use telemetry_producer::ProducerError;
use tokio::signal;
use tracing::{error, info, warn};

/// Synthetic vehicle telemetry producer
#[derive(Parser)]
#[command(name = "telemetry-producer")]
#[command(about = "Publish synthetic vehicle telemetry to an MQTT broker")]
#[command(version)]
struct Cli {
    /// Path to the .env file to use
    #[arg(long, value_name = "FILE", env = "TELEMETRY_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Seconds between publishes
    #[arg(long, env = "TELEMETRY_PUBLISH_INTERVAL_SECS", default_value_t = 10)]
    publish_interval_secs: u64,

    /// Seconds to wait for the broker to accept the connection
    #[arg(long, env = "TELEMETRY_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    connect_timeout_secs: u64,

    /// Seconds to wait for disconnection during shutdown
    #[arg(long, env = "TELEMETRY_DISCONNECT_TIMEOUT_SECS", default_value_t = 5)]
    disconnect_timeout_secs: u64,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and publish until interrupted (default)
    Run,
    /// Validate connection settings
    Config {
        /// Show resolved settings with secrets masked
        #[arg(long)]
        show: bool,
    },
}

impl Cli {
    fn producer_options(&self) -> ProducerOptions {
        ProducerOptions {
            publish_interval: Duration::from_secs(self.publish_interval_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            disconnect_timeout: Duration::from_secs(self.disconnect_timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging_with_verbosity(cli.verbose);

    info!(
        "Starting vehicle telemetry producer v{}",
        env!("CARGO_PKG_VERSION")
    );

    if let Some(path) = &cli.env_file {
        info!("Loading connection settings from: {}", path.display());
    }
    let settings = match ConnectionSettings::load(cli.env_file.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load connection settings: {}", e);
            process::exit(1);
        }
    };

    let options = cli.producer_options();
    let result = match cli.command {
        None | Some(Commands::Run) => run_producer(settings, options)
            .await
            .map(|outcome| {
                info!(
                    "Published {} messages (connected: {})",
                    outcome.messages_published, outcome.connected
                );
            }),
        Some(Commands::Config { show }) => handle_config_command(&settings, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

async fn run_producer(
    settings: ConnectionSettings,
    options: ProducerOptions,
) -> Result<RunOutcome, Box<dyn std::error::Error>> {
    info!("Initializing MQTT client");
    let client = MqttTelemetryClient::new(&settings).map_err(ProducerError::client)?;
    let mut producer = TelemetryProducer::new(settings.client_id.clone(), client, options);

    Ok(producer.run(shutdown_signal()).await?)
}

fn handle_config_command(
    settings: &ConnectionSettings,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Resolved connection settings:");
        println!("{}", toml::to_string_pretty(&settings.redacted())?);
    }

    info!("Configuration validation complete");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            if signal::ctrl_c().await.is_ok() {
                info!("Received SIGINT, shutting down gracefully...");
            }
            return;
        }
    };

    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Received SIGINT, shutting down gracefully..."),
            Err(e) => {
                warn!("Failed to listen for SIGINT: {}", e);
                sigterm.recv().await;
                info!("Received SIGTERM, shutting down gracefully...");
            }
        },
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
