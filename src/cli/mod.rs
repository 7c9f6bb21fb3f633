//! CLI module for VideoCutter
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// VideoCutter
///
/// Cuts a segment out of a video between two timecodes and re-encodes it with
/// ffmpeg, optionally applying filters, overlays, subtitles and speed changes.
#[derive(Parser, Debug)]
#[command(name = "videocutter")]
#[command(about = "Trim and re-encode video segments with ffmpeg")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Configuration file (default: videocutter.toml in the working directory)
    #[arg(long, global = true, env = "VIDEOCUTTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding bundled ffmpeg/ffprobe binaries
    #[arg(long, global = true)]
    pub bundled_dir: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cut a segment and re-encode it
    Cut(args::CutArgs),
    /// Show duration, frame rate and streams of a media file
    Probe(args::ProbeArgs),
    /// Print the file and start offset an external player should open
    Preview(args::PreviewArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "videocutter",
            "probe",
            "--input",
            "a.mp4",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Commands::Probe(_)));
    }
}
