//! # tether - headless protocol session
//!
//! Runs the object lifecycle end to end in-process: seat bindings and
//! capability broadcasts, a synchronized subsurface tree, and a window list
//! mirrored into a client-side model.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use tether::{headless, logging, Session, TetherConfig};

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Headless session for a Wayland-style object lifecycle layer")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/tether/tether.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Number of clients binding the seat
    #[arg(long, default_value_t = 3)]
    clients: usize,

    /// Number of server windows to mirror
    #[arg(long, default_value_t = 4)]
    windows: usize,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration decides the log format, so it is loaded first
    let (config, load_error) = match TetherConfig::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (TetherConfig::default(), Some(e)),
    };
    logging::init(&config.logging, cli.debug).context("Failed to initialize logging")?;

    info!("🚀 Starting tether");
    info!(
        "📄 Version: {} (commit {}, built {}, {})",
        tether::VERSION,
        tether::GIT_COMMIT,
        env!("BUILD_DATE"),
        env!("TARGET_TRIPLE")
    );
    match load_error {
        None => info!("✅ Configuration loaded from: {}", cli.config),
        Some(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
        }
    }

    let session = Session::new(&config);
    info!(
        "🏗️  Running headless session with {} clients and {} windows",
        cli.clients, cli.windows
    );

    let summary = headless::run(&session, cli.clients, cli.windows).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!("🪑 Seat bindings: {}", summary.seat_bindings);
        info!("📣 Capability updates: {}", summary.capability_updates);
        info!("🏷️  Name events: {}", summary.name_events);
        info!("🧱 Surfaces applied by root commit: {}", summary.surfaces_applied);
        info!("🪟 Model rows: {}", summary.model_rows);
        info!("📉 Minimized rows: {}", summary.minimized_rows);
        info!("📨 Window requests: {}", summary.window_requests);
    }

    info!("👋 tether shutting down");
    Ok(())
}
