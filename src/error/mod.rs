//! Error handling module for TimeMark

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for TimeMark operations
#[derive(Error, Debug)]
pub enum TimemarkError {
    /// Source file missing, probe tool failure, or no duration/geometry token
    #[error("Failed to probe media file {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    /// External transcoder exited with a non-zero status
    #[error("Transcoder exited with code {exit_code}: {diagnostics}")]
    CommandFailed { exit_code: i32, diagnostics: String },

    /// Executable not found at the expected location
    #[error("Required executable '{name}' is unavailable: {message}")]
    Resource { name: String, message: String },

    /// Operation stopped by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Request parameters failed validation
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Invalid time format
    #[error("Invalid time format: {time}. Expected YYYY-MM-DD HH:MM:SS")]
    InvalidTimeFormat { time: String },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TimemarkError {
    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// True when the operation ended because the caller asked it to stop
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Process exit code the CLI reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandFailed { exit_code, .. } if *exit_code != 0 => *exit_code,
            Self::Cancelled => 130,
            _ => 1,
        }
    }
}

/// Result type alias for TimeMark operations
pub type TimemarkResult<T> = std::result::Result<T, TimemarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        let failed = TimemarkError::CommandFailed {
            exit_code: 69,
            diagnostics: "Conversion failed!".to_string(),
        };
        assert_eq!(failed.exit_code(), 69);
        assert_eq!(TimemarkError::Cancelled.exit_code(), 130);
        assert_eq!(TimemarkError::invalid_request("bad").exit_code(), 1);
    }

    #[test]
    fn test_probe_error_message_includes_path() {
        let err = TimemarkError::probe("/videos/a.mp4", "no duration token found");
        let text = err.to_string();
        assert!(text.contains("/videos/a.mp4"));
        assert!(text.contains("no duration token found"));
        assert!(!err.is_cancelled());
    }
}
