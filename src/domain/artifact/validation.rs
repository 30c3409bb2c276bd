//! Validation verdicts for finished artifacts

use std::fmt;

use crate::domain::error::CaptureError;

/// Metadata loaded from a finished container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaMetadata {
    /// Seconds. Live containers without a duration header report infinity.
    pub duration: f64,
}

/// Why an artifact was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    ZeroLength,
    Corrupt,
    MetadataTimeout,
}

impl InvalidReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ZeroLength => "zero-length recording",
            Self::Corrupt => "corrupt recording",
            Self::MetadataTimeout => "metadata timeout",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<InvalidReason> for CaptureError {
    fn from(reason: InvalidReason) -> Self {
        match reason {
            InvalidReason::ZeroLength => Self::ZeroLengthRecording,
            InvalidReason::Corrupt => Self::CorruptRecording,
            InvalidReason::MetadataTimeout => Self::MetadataTimeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationOutcome {
    Valid { duration: f64 },
    Invalid(InvalidReason),
}

impl ValidationOutcome {
    /// Judge loaded metadata. Anything above zero, including infinity, is playable.
    pub fn from_metadata(metadata: MediaMetadata) -> Self {
        let duration = metadata.duration;
        if duration > 0.0 {
            Self::Valid { duration }
        } else if duration == 0.0 {
            Self::Invalid(InvalidReason::ZeroLength)
        } else {
            // negative or NaN
            Self::Invalid(InvalidReason::Corrupt)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn into_result(self) -> Result<f64, CaptureError> {
        match self {
            Self::Valid { duration } => Ok(duration),
            Self::Invalid(reason) => Err(reason.into()),
        }
    }
}
