mod config;
mod source;
mod telemetry;
mod tracker;
mod transport;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;

use crate::config::Config;
use crate::source::{FixDelivery, Permission, ReplaySource};
use crate::telemetry::{render_table, Encoder};
use crate::tracker::{TrackingController, TrackingMode};
use crate::transport::{SocketClient, Transport};

#[derive(Parser)]
#[command(name = "bus-relay")]
#[command(about = "Relay location fixes to a tracking server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and print the effective settings
    Validate { config: String },
    /// Track an operator, replaying fixes from a file as the location source
    Run {
        /// Bus / operator id attached to every report
        #[arg(long)]
        operator: String,
        /// YAML list of fixes ({latitude, longitude, speed?})
        #[arg(long)]
        fixes: String,
        /// Configuration file; built-in defaults when omitted
        #[arg(long)]
        config: Option<String>,
        /// Answer the foreground location permission request with "denied"
        #[arg(long)]
        deny_foreground: bool,
        /// Answer the background location permission request with "denied"
        #[arg(long)]
        deny_background: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run {
            operator,
            fixes,
            config,
            deny_foreground,
            deny_background,
        } => {
            let permissions = (
                Permission::granted_if(!deny_foreground),
                Permission::granted_if(!deny_background),
            );
            run(&operator, &fixes, config.as_deref(), permissions).await
        }
    }
}

fn validate(path: &str) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Configuration is valid");
    println!("  server:    {}", config.server.url);
    println!(
        "  reconnect: {} .. {}",
        humantime::format_duration(config.server.reconnect_delay),
        humantime::format_duration(config.server.reconnect_delay_max)
    );
    println!(
        "  timeout:   {}",
        humantime::format_duration(config.server.connect_timeout)
    );
    println!("  task:      {}", config.tracking.task_name);
    println!(
        "  interval:  {} (accuracy {}, distance filter {} m)",
        humantime::format_duration(config.tracking.interval),
        config.tracking.accuracy,
        config.tracking.distance_filter_m
    );
    println!(
        "  display:   last {} reports, UTC{}",
        config.display.capacity, config.display.utc_offset
    );
    ExitCode::SUCCESS
}

async fn run(
    operator: &str,
    fixes: &str,
    config_path: Option<&str>,
    (foreground, background): (Permission, Permission),
) -> ExitCode {
    let config = match config_path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let offset = match config.display.offset() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let delivery = FixDelivery::new();
    let source = match ReplaySource::from_file(fixes, delivery.clone()) {
        Ok(s) => Arc::new(s.with_permissions(foreground, background)),
        Err(e) => {
            eprintln!("Error loading fixes: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if source.is_empty() {
        eprintln!("No fixes in {}", fixes);
        return ExitCode::FAILURE;
    }

    let transport = match SocketClient::spawn(&config.server) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            eprintln!("Transport error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let controller = TrackingController::new(
        source.clone(),
        transport.clone(),
        Encoder::new(offset),
        &config.tracking,
        config.display.capacity,
    );
    delivery.register(controller.handler());

    if let Err(e) = controller.start(operator).await {
        eprintln!("Could not start tracking: {}", e);
        delivery.unregister();
        transport.shutdown().await;
        return ExitCode::FAILURE;
    }
    if let TrackingMode::Tracking { operator_id, since } = controller.mode() {
        println!(
            "Tracking {} since {}, press Ctrl-C to stop",
            operator_id,
            since.with_timezone(&offset).format("%H:%M:%S")
        );
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted"),
        _ = source.exhausted() => {}
    }

    controller.stop().await;
    delivery.unregister();
    let was_connected = transport.is_connected();
    transport.shutdown().await;

    println!(
        "Tracking stopped, {} reports kept for display",
        controller.reports().len()
    );
    if !was_connected {
        println!("(server was unreachable at stop time, some reports were not sent)");
    }
    print!("{}", render_table(&controller.rows()));
    ExitCode::SUCCESS
}
