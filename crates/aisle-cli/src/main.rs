//! Aisle CLI - Command-line tools for the Aisle venue editor

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{inspect, replay, triangulate};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aisle")]
#[command(about = "Headless tools for the Aisle venue scene", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a venue snapshot and print scene and resource statistics
    Inspect {
        /// Path to venue snapshot (TOML)
        snapshot: String,

        /// Custom mesh registry (TOML table of type -> asset URL)
        #[arg(long)]
        meshes: Option<String>,

        /// View settings file
        #[arg(long)]
        settings: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Feed a scripted gesture sequence to a view and print emitted intents as JSON
    Replay {
        /// Path to venue snapshot (TOML)
        snapshot: String,

        /// Path to gesture script (TOML with [[events]])
        gestures: String,

        /// View settings file
        #[arg(long)]
        settings: Option<String>,

        /// Print one intent per line instead of a JSON array
        #[arg(long)]
        lines: bool,
    },

    /// Triangulate a region polygon and report whether it is valid
    Triangulate {
        /// Path to polygon file (TOML with a `vertices` array)
        polygon: String,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so command output stays machine-readable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            snapshot,
            meshes,
            settings,
            format,
        } => inspect::run(inspect::InspectArgs {
            snapshot,
            meshes,
            settings,
            format,
        }),
        Commands::Replay {
            snapshot,
            gestures,
            settings,
            lines,
        } => replay::run(replay::ReplayArgs {
            snapshot,
            gestures,
            settings,
            lines,
        }),
        Commands::Triangulate { polygon } => triangulate::run(&polygon),
    }
}
