//! Artifact validator

use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::time::timeout;

use crate::domain::artifact::{Artifact, Blob, InvalidReason, ValidationOutcome};

use super::ports::MetadataProbe;

/// How long to wait for metadata before declaring the artifact unusable
pub const VALIDATION_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Probes a finished artifact for a usable duration.
#[derive(Clone)]
pub struct ArtifactValidator {
    probe: Arc<dyn MetadataProbe>,
    timeout: StdDuration,
}

impl ArtifactValidator {
    pub fn new(probe: Arc<dyn MetadataProbe>) -> Self {
        Self {
            probe,
            timeout: VALIDATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> StdDuration {
        self.timeout
    }

    pub async fn validate(&self, artifact: &Artifact) -> ValidationOutcome {
        let outcome = self.validate_blob(&artifact.blob).await;
        tracing::debug!(url = %artifact.url, ?outcome, "artifact validated");
        outcome
    }

    /// Runs the probe once with a bounded wait. Never retries.
    pub async fn validate_blob(&self, blob: &Blob) -> ValidationOutcome {
        match timeout(self.timeout, self.probe.load_metadata(blob)).await {
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "metadata probe timed out");
                ValidationOutcome::Invalid(InvalidReason::MetadataTimeout)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "metadata probe failed");
                ValidationOutcome::Invalid(InvalidReason::Corrupt)
            }
            Ok(Ok(metadata)) => ValidationOutcome::from_metadata(metadata),
        }
    }
}
