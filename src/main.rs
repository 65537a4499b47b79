// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(name = "depthmark")]
#[command(about = "Depth-camera sphere marker detection pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the cameras the demo rig provides
    List,

    /// Run the processing loop
    Run {
        /// Number of synthetic stereo cameras
        #[arg(short, long, default_value = "1")]
        cameras: usize,

        /// Add a structured-light (disparity) camera to the rig
        #[arg(long)]
        structured_light: bool,

        /// Add a camera that fails on every acquisition, to exercise
        /// the degrade policy
        #[arg(long)]
        inject_failure: bool,

        /// Stop after this many ticks (default: run until Ctrl-C)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Show edge frames
        #[arg(long)]
        edges: bool,

        /// Estimate surface normals
        #[arg(long)]
        normals: bool,

        /// Temporal smoothing window (frames); enables smoothing
        #[arg(short, long)]
        smoothing: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=depthmark=debug, RUST_LOG=info
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
        Commands::List => cli::list_cameras(),
        Commands::Run {
            cameras,
            structured_light,
            inject_failure,
            ticks,
            edges,
            normals,
            smoothing,
        } => cli::run_pipeline(cli::RunOptions {
            cameras,
            structured_light,
            inject_failure,
            ticks,
            edges,
            normals,
            smoothing,
        }),
    }
}
