//! File-backed object URL store
//!
//! Each blob is written to a private spool directory and addressed with a
//! `file://` URL, so other processes (players, file managers) can open the
//! recording before it is saved. Revoking deletes the file. The spool
//! directory is removed when the store is dropped.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;
use uuid::Uuid;

use crate::application::ports::{ObjectUrlStore, UrlError};
use crate::domain::artifact::{Blob, ObjectUrl};

pub struct SpoolUrlStore {
    dir: TempDir,
    entries: Mutex<HashMap<String, (PathBuf, Blob)>>,
}

impl SpoolUrlStore {
    pub fn new() -> Result<Self, UrlError> {
        let dir = tempfile::Builder::new()
            .prefix("camcorder-spool-")
            .tempdir()
            .map_err(|e| UrlError::CreateFailed(format!("spool directory: {}", e)))?;
        Ok(Self {
            dir,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn spool_dir(&self) -> &std::path::Path {
        self.dir.path()
    }
}

#[async_trait]
impl ObjectUrlStore for SpoolUrlStore {
    async fn create(&self, blob: &Blob) -> Result<ObjectUrl, UrlError> {
        let path = self
            .dir
            .path()
            .join(format!("{}.{}", Uuid::new_v4(), blob.format().extension()));

        let target = path.clone();
        let contents = blob.clone();
        tokio::task::spawn_blocking(move || std::fs::write(&target, contents.bytes()))
            .await
            .map_err(|e| UrlError::CreateFailed(format!("spool writer: {}", e)))?
            .map_err(|e| UrlError::CreateFailed(format!("{}: {}", path.display(), e)))?;

        let url = format!("file://{}", path.display());
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| UrlError::CreateFailed("url table poisoned".to_string()))?;
        entries.insert(url.clone(), (path, blob.clone()));
        Ok(ObjectUrl::new(url))
    }

    fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = self
            .entries
            .lock()
            .ok()
            .and_then(|mut entries| entries.remove(url.as_str()));
        match removed {
            Some((path, _)) => {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove spooled recording");
                }
                true
            }
            None => false,
        }
    }

    fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.entries
            .lock()
            .ok()?
            .get(url.as_str())
            .map(|(_, blob)| blob.clone())
    }

    fn live_count(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}
