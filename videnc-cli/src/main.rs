//! videnc CLI
//!
//! Drive any encoder backend from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Show encoder types, parameter ranges and library availability
//! videnc info
//!
//! # Encode a raw I420 file to an H.264 elementary stream
//! videnc encode -i input.yuv -o output.h264 --width 1280 --height 720
//!
//! # Write a default config file
//! videnc config init
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// videnc - one lifecycle over software and hardware video encoders
#[derive(Parser)]
#[command(name = "videnc")]
#[command(version)]
#[command(about = "Encode raw I420 video with OpenH264, NETINT or VPE encoders", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show encoder types, parameter ranges and library availability
    Info(commands::InfoArgs),

    /// Encode a raw I420 file into an elementary stream
    Encode(commands::EncodeArgs),

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("videnc_core={}", level).parse()?)
                .add_directive(format!("videnc={}", level).parse()?),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Info(args) => commands::info(args)?,
        Commands::Encode(args) => commands::encode(args)?,
        Commands::Config(args) => commands::config(args)?,
    }

    Ok(())
}
