//! Object URL port

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::artifact::{Blob, ObjectUrl};
use crate::domain::error::CaptureError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to create object URL: {0}")]
    CreateFailed(String),
}

impl From<UrlError> for CaptureError {
    fn from(err: UrlError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Port that mints dereferenceable URLs for blobs.
///
/// A URL stays resolvable until `revoke` is called for it. Minting may touch
/// storage, so it is asynchronous; revoking is not.
#[async_trait]
pub trait ObjectUrlStore: Send + Sync {
    async fn create(&self, blob: &Blob) -> Result<ObjectUrl, UrlError>;

    /// Returns whether the URL was live.
    fn revoke(&self, url: &ObjectUrl) -> bool;

    fn resolve(&self, url: &ObjectUrl) -> Option<Blob>;

    /// Number of URLs created and not yet revoked
    fn live_count(&self) -> usize;
}
