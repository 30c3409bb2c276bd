//! Directory sink: saves the artifact under its download filename

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::application::ports::{ArtifactSink, SinkError, SinkReceipt};
use crate::domain::artifact::Artifact;

/// Writes `recording.<ext>` into a directory, replacing any previous file
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn target_for(&self, artifact: &Artifact) -> PathBuf {
        self.dir.join(artifact.download_filename())
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn deliver(&self, artifact: &Artifact) -> Result<SinkReceipt, SinkError> {
        if artifact.blob.is_empty() {
            return Err(SinkError::Rejected("recording is empty".to_string()));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SinkError::Io(format!("{}: {}", self.dir.display(), e)))?;

        let target = self.target_for(artifact);
        tokio::fs::write(&target, artifact.blob.bytes())
            .await
            .map_err(|e| SinkError::Io(format!("{}: {}", target.display(), e)))?;

        tracing::info!(path = %target.display(), bytes = artifact.size(), "recording saved");
        Ok(SinkReceipt {
            location: target.display().to_string(),
            bytes: artifact.size(),
        })
    }
}
