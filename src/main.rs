// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use photo_capture::backends::camera::CameraBackendType;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "photo-capture")]
#[command(about = "Capture still photos from a camera")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Camera backend (overrides the config file)
    #[arg(short, long, global = true)]
    backend: Option<CameraBackendType>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Take a photo
    Photo {
        /// Camera path or id to use (from 'photo-capture list')
        #[arg(short, long)]
        camera: Option<String>,

        /// Output file path (default: ~/Pictures/photo-capture/photo_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control the log level
    // Examples: RUST_LOG=debug, RUST_LOG=photo_capture=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    tracing::debug!(version = env!("GIT_VERSION"), "Starting photo-capture");

    let cli = Cli::parse();

    let mut config = photo_capture::Config::load();
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    match cli.command {
        Commands::List => cli::list_cameras(&config),
        Commands::Photo { camera, output } => {
            if camera.is_some() {
                config.preferred_device = camera;
            }
            cli::take_photo(&config, output)
        }
        Commands::Config => cli::print_config(&config),
    }
}
