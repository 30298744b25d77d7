//! Playhead CLI - Headless Playback Driver
//!
//! Features:
//! - Scripted playback simulation against a simulated media resource
//! - Storage URL resolution for videos and posters
//! - Keyboard binding listing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;
mod script;

/// Playhead CLI - Playback controller toolkit
#[derive(Parser)]
#[command(name = "playhead")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Drive and inspect the Playhead playback controller", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a playback script against a simulated resource
    Simulate {
        /// JSON script file (built-in demo when omitted)
        script: Option<PathBuf>,

        /// Source path of the simulated video
        #[arg(short, long, default_value = "clip.mp4")]
        source: String,

        /// Available qualities, comma separated
        #[arg(short, long, default_value = "1080p,720p,480p")]
        qualities: String,

        /// Start playback automatically
        #[arg(short, long)]
        autoplay: bool,

        /// Simulated autoplay policy (allow, muted-only, block)
        #[arg(long, default_value = "allow")]
        policy: String,

        /// Player configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Storage base URL
        #[arg(long, default_value = "http://localhost:4200/storage")]
        base: String,
    },

    /// Resolve a storage path to a fetchable URL
    Resolve {
        /// Video or poster path
        path: String,

        /// Storage base URL
        #[arg(short, long, conflicts_with = "api")]
        base: Option<String>,

        /// Content API URL; the storage base is derived from it
        #[arg(long)]
        api: Option<String>,

        /// Quality variant (360p .. 4k)
        #[arg(short, long)]
        quality: Option<String>,

        /// Resolve as a poster image
        #[arg(short, long)]
        poster: bool,
    },

    /// List keyboard shortcuts
    Keys {
        /// Player configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    playhead_core::init();

    match cli.command {
        Commands::Simulate {
            script,
            source,
            qualities,
            autoplay,
            policy,
            config,
            base,
        } => {
            let options = commands::SimulateOptions {
                script,
                source,
                qualities,
                autoplay,
                policy,
                config,
                base,
            };
            commands::simulate(options, &cli.format).await?;
        }
        Commands::Resolve {
            path,
            base,
            api,
            quality,
            poster,
        } => {
            commands::resolve(&path, base, api, quality, poster, &cli.format)?;
        }
        Commands::Keys { config } => {
            commands::keys(config, &cli.format)?;
        }
    }

    Ok(())
}
