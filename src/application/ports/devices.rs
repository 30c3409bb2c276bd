//! Media device port

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::error::CaptureError;
use crate::domain::media::{MediaConstraints, MediaStream};

/// Device acquisition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("no device found: {0}")]
    NotFound(String),

    #[error("device is in use: {0}")]
    Busy(String),

    #[error("access denied by the operating system: {0}")]
    Denied(String),

    #[error("{0}")]
    Failed(String),
}

impl From<DeviceError> for CaptureError {
    fn from(err: DeviceError) -> Self {
        Self::DeviceUnavailable(err.to_string())
    }
}

/// Port for opening capture hardware
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Open the devices the constraints ask for.
    ///
    /// Every track of the returned stream holds its hardware until `stop()`
    /// is called on it.
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream, DeviceError>;
}
