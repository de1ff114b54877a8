//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Clock overlay options
#[derive(Args, Debug, Clone)]
pub struct ClockArgs {
    /// Date and time the burned-in clock starts from (YYYY-MM-DD HH:MM:SS)
    #[arg(short, long)]
    pub start: String,

    /// Font size in points [default: from config, 45]
    #[arg(long)]
    pub font_size: Option<u32>,

    /// Horizontal text offset in pixels [default: from config, 20]
    #[arg(long)]
    pub text_x: Option<u32>,

    /// Vertical text offset in pixels [default: from config, 20]
    #[arg(long)]
    pub text_y: Option<u32>,
}

/// Crop rectangle, in source pixels
#[derive(Args, Debug, Clone)]
pub struct CropRectArgs {
    /// Width of the kept region
    #[arg(long)]
    pub width: u32,

    /// Height of the kept region
    #[arg(long)]
    pub height: u32,

    /// Left edge of the kept region
    #[arg(long, default_value_t = 0)]
    pub x: u32,

    /// Top edge of the kept region
    #[arg(long, default_value_t = 0)]
    pub y: u32,
}

/// Arguments for the watermark command
#[derive(Args, Debug)]
pub struct WatermarkArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory (default: next to the input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub clock: ClockArgs,
}

/// Arguments for the crop command
#[derive(Args, Debug)]
pub struct CropArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory (default: next to the input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub rect: CropRectArgs,
}

/// Arguments for the crop-watermark command
#[derive(Args, Debug)]
pub struct CropWatermarkArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory (default: next to the input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub rect: CropRectArgs,

    #[command(flatten)]
    pub clock: ClockArgs,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
