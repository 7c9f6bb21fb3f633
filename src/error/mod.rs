//! Error handling module for VideoCutter

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for VideoCutter operations
#[derive(Error, Debug)]
pub enum CutterError {
    /// Timecode text does not match `HH:MM:SS[.mmm]`
    #[error("Invalid timecode '{input}': {reason}. Expected HH:MM:SS[.mmm]")]
    TimecodeFormat { input: String, reason: String },

    /// Numeric time value outside the representable range
    #[error("Time value out of range: {message}")]
    TimecodeRange { message: String },

    /// ffmpeg or ffprobe could not be found in the bundled directory or on PATH
    #[error("{tool} not found (looked in {searched})")]
    BinaryNotFound { tool: String, searched: String },

    /// Probe binary was located but could not be started
    #[error("Failed to start probe process: {message}")]
    ProbeUnavailable { message: String },

    /// Probe process exceeded its time budget
    #[error("Probe of {path} timed out after {timeout:?}")]
    ProbeTimeout { path: PathBuf, timeout: Duration },

    /// Probe output could not be decoded into media information
    #[error("Failed to parse probe output: {message}")]
    ProbeParse { message: String },

    /// Encoder process could not be spawned
    #[error("Failed to launch encoder: {message}")]
    Launch { message: String },

    /// Job parameters violate a construction invariant
    #[error("Invalid job: {message}")]
    InvalidJob { message: String },

    /// Profile name is not one of the known presets
    #[error("Unsupported encoding profile '{name}'. Known profiles: fast, balanced, high_quality")]
    UnsupportedProfile { name: String },

    /// `start` called while a run is in progress
    #[error("An encoder process is already running on this supervisor")]
    AlreadyRunning,

    /// Transition attempted after the run reached a terminal state
    #[error("Run already finished with state {state}")]
    AlreadyTerminal { state: String },

    /// `cancel` called before any run was started
    #[error("No encoder process is running")]
    NotRunning,

    /// Configuration file or environment value is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CutterError {
    /// Whether a caller may automatically retry the failed operation once
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CutterError::ProbeTimeout { .. } | CutterError::ProbeParse { .. }
        )
    }

    /// User-facing remediation hint for configuration problems
    pub fn remediation_hint(&self) -> Option<String> {
        match self {
            CutterError::BinaryNotFound { tool, .. } => Some(format!(
                "Install FFmpeg and make sure '{}' is on PATH, or place it in the bundled \
                 'ffmpeg' directory next to the executable (see [binaries] in videocutter.toml)",
                tool
            )),
            _ => None,
        }
    }

    pub(crate) fn invalid_job(message: impl Into<String>) -> Self {
        CutterError::InvalidJob {
            message: message.into(),
        }
    }
}

/// Result type alias for VideoCutter operations
pub type CutterResult<T> = std::result::Result<T, CutterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_errors_are_retryable() {
        let timeout = CutterError::ProbeTimeout {
            path: PathBuf::from("a.mp4"),
            timeout: Duration::from_secs(1),
        };
        let parse = CutterError::ProbeParse {
            message: "missing duration".to_string(),
        };
        assert!(timeout.is_retryable());
        assert!(parse.is_retryable());
    }

    #[test]
    fn test_launch_and_binary_errors_are_not_retryable() {
        let launch = CutterError::Launch {
            message: "permission denied".to_string(),
        };
        let missing = CutterError::BinaryNotFound {
            tool: "ffmpeg".to_string(),
            searched: "PATH".to_string(),
        };
        assert!(!launch.is_retryable());
        assert!(!missing.is_retryable());
        assert!(missing.remediation_hint().unwrap().contains("ffmpeg"));
        assert!(launch.remediation_hint().is_none());
    }
}
