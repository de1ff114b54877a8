//! CLI module for TimeMark
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// TimeMark
///
/// Burns a running date/time clock into videos and crops them, driving an
/// external ffmpeg binary.
#[derive(Parser, Debug)]
#[command(name = "timemark")]
#[command(about = "TimeMark - Burn a running clock into videos and crop them")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TIMEMARK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Configuration file (default: ./timemark.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// ffmpeg executable name or path
    #[arg(long, global = true, env = "TIMEMARK_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe executable name or path
    #[arg(long, global = true, env = "TIMEMARK_FFPROBE")]
    pub ffprobe: Option<PathBuf>,

    /// Font file used for the clock overlay
    #[arg(long, global = true, env = "TIMEMARK_FONT_FILE")]
    pub font_file: Option<String>,

    /// Clock text colour
    #[arg(long, global = true)]
    pub font_color: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Burn a running clock into a video
    Watermark(args::WatermarkArgs),
    /// Crop a video to a rectangle
    Crop(args::CropArgs),
    /// Crop a video, then burn a running clock into it
    CropWatermark(args::CropWatermarkArgs),
    /// Show duration and frame size of a video
    Probe(args::ProbeArgs),
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
    fn test_parse_crop_watermark() {
        let cli = Cli::try_parse_from([
            "timemark",
            "crop-watermark",
            "--input",
            "clip.mp4",
            "--width",
            "640",
            "--height",
            "480",
            "--start",
            "2024-01-01 08:00:00",
            "--text-x",
            "5",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::CropWatermark(args) => {
                assert_eq!(args.rect.width, 640);
                assert_eq!(args.rect.x, 0);
                assert_eq!(args.clock.text_x, Some(5));
                assert_eq!(args.clock.font_size, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_crop_requires_size() {
        assert!(Cli::try_parse_from(["timemark", "crop", "--input", "clip.mp4"]).is_err());
    }
}
