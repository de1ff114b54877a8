//! Configuration initialization and hierarchy management

use std::path::{Path, PathBuf};

use tracing::info;

use crate::adapters::AppConfig;
use crate::cli::Cli;
use crate::error::TimemarkResult;
use crate::utils::logging::{LogFormat, LogLevel};

/// Values given on the command line or through `TIMEMARK_*` variables
///
/// clap folds the environment into these, so a flag beats its variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub font_file: Option<String>,
    pub font_color: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

impl ConfigOverrides {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            ffmpeg: cli.ffmpeg.clone(),
            ffprobe: cli.ffprobe.clone(),
            font_file: cli.font_file.clone(),
            font_color: cli.font_color.clone(),
            log_level: cli.log_level.clone(),
            log_format: cli.log_format.clone(),
        }
    }
}

/// Resolve configuration following precedence: CLI > Env > File > Defaults
pub fn resolve_config(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> TimemarkResult<AppConfig> {
    let mut config = AppConfig::load_or_default(config_path)?;
    apply_overrides(&mut config, overrides)?;
    config.validate()?;
    Ok(config)
}

/// Apply command-line and environment overrides onto a loaded configuration
pub fn apply_overrides(config: &mut AppConfig, overrides: &ConfigOverrides) -> TimemarkResult<()> {
    let mut applied = 0;

    if let Some(ffmpeg) = &overrides.ffmpeg {
        config.tools.ffmpeg = ffmpeg.clone();
        applied += 1;
    }
    if let Some(ffprobe) = &overrides.ffprobe {
        config.tools.ffprobe = ffprobe.clone();
        applied += 1;
    }
    if let Some(font_file) = &overrides.font_file {
        config.watermark.font_file = font_file.clone();
        applied += 1;
    }
    if let Some(font_color) = &overrides.font_color {
        config.watermark.font_color = font_color.clone();
        applied += 1;
    }
    if let Some(level) = &overrides.log_level {
        config.logging.level = level.parse::<LogLevel>()?;
        applied += 1;
    }
    if let Some(format) = &overrides.log_format {
        config.logging.format = format.parse::<LogFormat>()?;
        applied += 1;
    }

    if applied > 0 {
        info!("Applied {} configuration overrides", applied);
    }
    Ok(())
}
