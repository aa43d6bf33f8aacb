// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "photobooth")]
#[command(about = "Terminal photobooth for Linux webcams")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive booth (default)
    Booth,

    /// List available cameras
    List,

    /// Capture a single photo without the interface
    Snap {
        /// Camera index to use (from 'photobooth list')
        #[arg(short, long)]
        camera: Option<usize>,

        /// Output file path (default: export directory, photobooth-TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=photobooth=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Snap { camera, output }) => cli::snap(camera, output),
        Some(Commands::Booth) | None => photobooth::terminal::run(),
    }
}
