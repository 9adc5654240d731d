//! SketchTrace CLI, the main entry point.
//!
//! Commands:
//! - `onboard`  Write a default config file
//! - `relay`    Start the event relay
//! - `send`     Build an event from a captured snapshot and send it
//! - `status`   Show effective configuration
//! - `doctor`   Diagnose configuration problems

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "sketchtrace",
    about = "SketchTrace: wide-event telemetry for the drawing app frontend",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Start the relay server
    Relay {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build a wide event from a captured browser snapshot and send it
    Send {
        /// Snapshot JSON file
        snapshot: PathBuf,

        /// Which lifecycle event to build
        #[arg(short, long, value_enum, default_value_t = EventKind::Load)]
        event: EventKind,

        /// Print the event without sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show effective configuration
    Status,

    /// Diagnose configuration problems
    Doctor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventKind {
    Load,
    Unload,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Relay { port } => commands::relay::run(port).await?,
        Commands::Send {
            snapshot,
            event,
            dry_run,
        } => commands::send::run(&snapshot, event, dry_run).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
