//! VideoCutter CLI
//!
//! Trims a video between two timecodes and re-encodes the segment with
//! ffmpeg.
//!
//! # Usage
//!
//! ```bash
//! videocutter cut -i talk.mp4 -s 00:01:00 -e 00:02:30 --profile fast
//! videocutter cut -i talk.mp4 -s 1:00 -e 2:30 --text "Intro" --speed 1.5
//! videocutter probe -i talk.mp4 --json
//! videocutter preview -i talk.mp4 -s 00:01:00
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use videocutter::app::DefaultAppContainer;
use videocutter::cli::{commands, Cli, Commands};
use videocutter::config_initialization::initialize_configuration;
use videocutter::error::CutterError;
use videocutter::utils::logging::{init_logging, log_system_info};

/// Main entry point for the VideoCutter CLI application
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            if let Some(hint) = e
                .downcast_ref::<CutterError>()
                .and_then(CutterError::remediation_hint)
            {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = initialize_configuration(&cli)?;
    init_logging(&config.logging);
    log_system_info();

    match cli.command {
        Commands::Cut(args) => {
            debug!("Executing cut command");
            let container = DefaultAppContainer::new(config)?;
            commands::cut(&container, args).await
        }
        Commands::Probe(args) => {
            debug!("Executing probe command");
            let container = DefaultAppContainer::new(config)?;
            commands::probe(&container, args).await
        }
        Commands::Preview(args) => {
            debug!("Executing preview command");
            commands::preview(args)
        }
    }
}
