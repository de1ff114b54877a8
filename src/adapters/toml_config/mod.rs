// TOML config adapter - Application configuration loaded from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TimemarkError, TimemarkResult};
use crate::utils::logging::LoggingConfig;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "timemark.toml";

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tools: ToolsConfig,
    pub watermark: WatermarkConfig,
    pub progress: ProgressConfig,
    pub logging: LoggingConfig,
}

/// External executables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Transcoder name or path
    pub ffmpeg: PathBuf,
    /// Probe tool name or path; banner parsing is used when it cannot be found
    pub ffprobe: PathBuf,
    pub probe_timeout_secs: u64,
}

/// Clock overlay appearance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub font_file: String,
    pub font_color: String,
    pub font_size: u32,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Bound of the progress event channel
    pub channel_capacity: usize,
    /// Diagnostic lines kept for failure reports
    pub diagnostic_tail_lines: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            probe_timeout_secs: 30,
        }
    }
}

impl ToolsConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            font_file: "arial.ttf".to_string(),
            font_color: "red".to_string(),
            font_size: 45,
            x: 20,
            y: 20,
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            diagnostic_tail_lines: 40,
        }
    }
}

impl AppConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> TimemarkResult<Self> {
        toml::from_str(content).map_err(|e| TimemarkError::Config {
            message: format!("Failed to parse TOML config: {}", e),
        })
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> TimemarkResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TimemarkError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Load `path` if given, else `timemark.toml` if present, else defaults
    ///
    /// An explicitly named file must exist.
    pub fn load_or_default(path: Option<&Path>) -> TimemarkResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    tracing::debug!("No configuration file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Serialize configuration back to TOML
    pub fn to_toml_string(&self) -> TimemarkResult<String> {
        toml::to_string_pretty(self).map_err(|e| TimemarkError::Config {
            message: format!("Failed to serialize config: {}", e),
        })
    }

    /// Reject values no operation can run with
    pub fn validate(&self) -> TimemarkResult<()> {
        if self.tools.ffmpeg.as_os_str().is_empty() {
            return Err(config_error("tools.ffmpeg cannot be empty"));
        }
        if self.tools.probe_timeout_secs == 0 {
            return Err(config_error("tools.probe_timeout_secs must be greater than 0"));
        }
        if self.watermark.font_size == 0 {
            return Err(config_error("watermark.font_size must be greater than 0"));
        }
        if self.watermark.font_file.trim().is_empty() {
            return Err(config_error("watermark.font_file cannot be empty"));
        }
        if self.progress.channel_capacity == 0 {
            return Err(config_error("progress.channel_capacity must be greater than 0"));
        }
        if self.progress.diagnostic_tail_lines == 0 {
            return Err(config_error("progress.diagnostic_tail_lines must be greater than 0"));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> TimemarkError {
    TimemarkError::Config {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::LogLevel;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.watermark.font_size, 45);
        assert_eq!((config.watermark.x, config.watermark.y), (20, 20));
        assert_eq!(config.progress.channel_capacity, 64);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [tools]
            ffmpeg = "/opt/ffmpeg/bin/ffmpeg"

            [watermark]
            font_size = 60

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.tools.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.tools.ffprobe, PathBuf::from("ffprobe"));
        assert_eq!(config.watermark.font_size, 60);
        assert_eq!(config.watermark.font_color, "red");
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml_str("[tools\nffmpeg = ").unwrap_err();
        assert!(matches!(err, TimemarkError::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = AppConfig::default();
        config.progress.channel_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.tools.probe_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_and_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[progress]\nchannel_capacity = 8").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.progress.channel_capacity, 8);

        let text = config.to_toml_string().unwrap();
        assert_eq!(AppConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = AppConfig::load_or_default(Some(Path::new("/no/such/timemark.toml"))).unwrap_err();
        assert!(matches!(err, TimemarkError::Config { .. }));
    }
}
