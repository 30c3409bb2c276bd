//! In-process object URL store

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::ports::{ObjectUrlStore, UrlError};
use crate::domain::artifact::{Blob, ObjectUrl};

const SCHEME_PREFIX: &str = "blob:camcorder/";

/// Keeps blobs in memory under `blob:camcorder/<uuid>` URLs
#[derive(Default)]
pub struct MemoryUrlStore {
    entries: Mutex<HashMap<String, Blob>>,
}

impl MemoryUrlStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectUrlStore for MemoryUrlStore {
    async fn create(&self, blob: &Blob) -> Result<ObjectUrl, UrlError> {
        let url = format!("{}{}", SCHEME_PREFIX, Uuid::new_v4());
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| UrlError::CreateFailed("url table poisoned".to_string()))?;
        entries.insert(url.clone(), blob.clone());
        Ok(ObjectUrl::new(url))
    }

    fn revoke(&self, url: &ObjectUrl) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.remove(url.as_str()).is_some())
            .unwrap_or(false)
    }

    fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.entries.lock().ok()?.get(url.as_str()).cloned()
    }

    fn live_count(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}
