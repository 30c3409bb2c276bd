//! Domain error types

use thiserror::Error;

use crate::domain::media::DeviceKind;
use crate::domain::recording::{InvalidStateTransition, SessionStatus};

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected format: <number>s, <number>m, or <number>m<number>s (e.g., 30s, 1m, 2m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}

/// Everything a recording session can report to its caller.
///
/// `AlreadyRecording`, `NotRecording`, `Busy`, `Cancelled` and `SessionClosed`
/// are benign: they describe a command that had nothing to do and never reach
/// the `last_error` channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Permission for the {device} is denied. Allow access in your system settings and try again")]
    PermissionDenied { device: DeviceKind },

    #[error("This runtime cannot record {requirement}. {suggestion}")]
    UnsupportedRuntime {
        requirement: String,
        suggestion: String,
    },

    #[error("Cannot open capture device: {0}")]
    DeviceUnavailable(String),

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Session is {0}; try again when it is idle")]
    Busy(SessionStatus),

    #[error("Start-up was cancelled")]
    Cancelled,

    #[error("Recording session has shut down")]
    SessionClosed,

    #[error("zero-length recording")]
    ZeroLengthRecording,

    #[error("corrupt recording")]
    CorruptRecording,

    #[error("metadata timeout")]
    MetadataTimeout,

    #[error("Recorder failed: {0}")]
    RecorderFailed(String),

    #[error("Artifact storage failed: {0}")]
    Storage(String),

    #[error("{0}")]
    InvalidState(#[from] InvalidStateTransition),
}

impl CaptureError {
    /// Whether this is a benign "nothing to do" report rather than a failure.
    pub const fn is_benign(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRecording
                | Self::NotRecording
                | Self::Busy(_)
                | Self::Cancelled
                | Self::SessionClosed
        )
    }

    /// Short machine-readable code for the presentation layer.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "permission_denied",
            Self::UnsupportedRuntime { .. } => "unsupported_runtime",
            Self::DeviceUnavailable(_) => "device_unavailable",
            Self::AlreadyRecording => "already_recording",
            Self::NotRecording => "not_recording",
            Self::Busy(_) => "busy",
            Self::Cancelled => "cancelled",
            Self::SessionClosed => "session_closed",
            Self::ZeroLengthRecording => "zero_length_recording",
            Self::CorruptRecording => "corrupt_recording",
            Self::MetadataTimeout => "metadata_timeout",
            Self::RecorderFailed(_) => "recorder_failed",
            Self::Storage(_) => "storage",
            Self::InvalidState(_) => "invalid_state",
        }
    }
}
