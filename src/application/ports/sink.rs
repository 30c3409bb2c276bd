//! Artifact sink port

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::artifact::Artifact;
use crate::domain::error::CaptureError;

/// Sink errors
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("Failed to write recording: {0}")]
    Io(String),

    #[error("Recording was rejected: {0}")]
    Rejected(String),
}

impl From<SinkError> for CaptureError {
    fn from(err: SinkError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Where a delivered artifact ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    pub location: String,
    pub bytes: usize,
}

/// Port for handing a validated artifact to durable storage.
///
/// Receives the binary content plus its MIME type through the artifact's blob.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn deliver(&self, artifact: &Artifact) -> Result<SinkReceipt, SinkError>;
}
