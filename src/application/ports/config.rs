//! Persistent settings port

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Where the user's config layer lives between runs
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// The stored layer. A missing file is an empty layer.
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    /// Replace the stored layer with `config`.
    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    fn path(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Seed the store with defaults; `AlreadyExists` if something is there.
    async fn init(&self) -> Result<(), ConfigError>;
}
