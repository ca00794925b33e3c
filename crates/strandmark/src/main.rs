//! Strandmark CLI - reference host for the image provenance pipeline.
//!
//! Watches a folder of photos and writes strand and constellation
//! signatures for every image added while it runs.
//!
//! # Usage
//!
//! ```bash
//! # Watch the configured folder
//! strandmark watch
//!
//! # Watch a specific folder and register constellations remotely
//! strandmark watch ~/DCIM --output ./provenance --register
//!
//! # Check a copy of an image against its stored artifacts
//! strandmark verify copy.jpg --strands pixel_strands_42.txt --constellation constellation_42.json
//!
//! # View configuration
//! strandmark config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Strandmark - provenance signatures for newly captured photos.
#[derive(Parser, Debug)]
#[command(name = "strandmark")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch a folder and extract signatures from new images
    Watch(cli::watch::WatchArgs),

    /// Compare an image against stored strand/constellation artifacts
    Verify(cli::verify::VerifyArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match strandmark_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `strandmark config path`."
            );
            strandmark_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Strandmark v{}", strandmark_core::VERSION);

    match cli.command {
        Commands::Watch(args) => cli::watch::execute(args, config).await,
        Commands::Verify(args) => cli::verify::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
