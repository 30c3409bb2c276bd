//! Metadata probe port

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::artifact::{Blob, MediaMetadata};

/// Probe errors
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("Cannot decode recording: {0}")]
    Decode(String),

    #[error("Probe I/O failed: {0}")]
    Io(String),
}

/// Port for loading container metadata through a disposable handle
/// that is independent of the recording path
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    async fn load_metadata(&self, blob: &Blob) -> Result<MediaMetadata, ProbeError>;
}
