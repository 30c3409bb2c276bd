//! Device permission port

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::media::{DeviceKind, PermissionState};

/// Permission query errors
#[derive(Debug, Clone, Error)]
pub enum PermissionQueryError {
    #[error("Permission query is not supported: {0}")]
    Unsupported(String),

    #[error("Permission query failed: {0}")]
    Failed(String),
}

/// Port for reading the current authorization state of a capture device
#[async_trait]
pub trait PermissionQuery: Send + Sync {
    /// Query one device. Has no side effects; never prompts.
    async fn query(&self, device: DeviceKind) -> Result<PermissionState, PermissionQueryError>;
}
