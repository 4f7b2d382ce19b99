// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vcam_filter::{Config, FilterKind, Resolution};

mod cli;

#[derive(Parser)]
#[command(name = "vcam-filter")]
#[command(about = "Colour filters for your webcam, republished as a virtual camera")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Config file (default: ~/.config/vcam-filter/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List video devices and mark loopback outputs
    Devices,

    /// Filter a camera or image and stream it to the virtual camera
    Stream {
        /// Image file or capture device (/dev/videoN)
        #[arg(short, long)]
        input: Option<String>,

        /// Virtual camera device
        #[arg(short, long)]
        device: Option<String>,

        /// Filter name (none, grayscale, sepia, invert, warm, cool)
        #[arg(short, long)]
        filter: Option<FilterKind>,

        /// Filter strength between 0 and 1
        #[arg(short, long)]
        strength: Option<f32>,

        /// Force the output resolution (WxH)
        #[arg(short, long)]
        resolution: Option<Resolution>,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,
    },

    /// Filter one image and save the result
    Snapshot {
        /// Input image
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: ./vcam_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long)]
        filter: Option<FilterKind>,

        #[arg(short, long)]
        strength: Option<f32>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control the log level, e.g. RUST_LOG=vcam_filter=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Devices => cli::list_devices(),
        Commands::Stream {
            input,
            device,
            filter,
            strength,
            resolution,
            frames,
        } => cli::stream(
            config,
            cli::StreamOptions {
                input,
                device,
                filter,
                strength,
                resolution,
                frames,
            },
        ),
        Commands::Snapshot {
            input,
            output,
            filter,
            strength,
        } => cli::snapshot(&config, &input, output, filter, strength),
    }
}
