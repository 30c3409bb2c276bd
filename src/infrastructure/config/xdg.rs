//! TOML config file under the user's config directory
//!
//! Resolves to `$XDG_CONFIG_HOME/camcorder/config.toml` unless
//! `CAMCORDER_CONFIG` names a file. Writes go through a sibling temp file
//! and a rename so a crash never leaves a half-written config behind.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "CAMCORDER_CONFIG";

const APP_DIR: &str = "camcorder";
const FILE_NAME: &str = "config.toml";

pub struct XdgConfigStore {
    path: PathBuf,
}

impl XdgConfigStore {
    pub fn new() -> Self {
        let path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
            _ => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("~/.config"))
                .join(APP_DIR)
                .join(FILE_NAME),
        };
        Self { path }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse_toml(content: &str) -> Result<AppConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn to_toml(config: &AppConfig) -> Result<String, ConfigError> {
        toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    fn write_atomically(path: &Path, content: &str) -> Result<(), ConfigError> {
        let write_err = |e: std::io::Error| ConfigError::WriteError(e.to_string());
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        staged.write_all(content.as_bytes()).map_err(write_err)?;
        staged.as_file().sync_all().map_err(write_err)?;
        staged
            .persist(path)
            .map_err(|e| ConfigError::WriteError(e.error.to_string()))?;
        Ok(())
    }
}

impl Default for XdgConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for XdgConfigStore {
    async fn load(&self) -> Result<AppConfig, ConfigError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Self::parse_toml(&content),
            // A missing file is an empty layer, not an error.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(AppConfig::empty()),
            Err(e) => Err(ConfigError::ReadError(e.to_string())),
        }
    }

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let content = Self::to_toml(config)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::write_atomically(&path, &content))
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    async fn init(&self) -> Result<(), ConfigError> {
        if self.exists() {
            return Err(ConfigError::AlreadyExists(self.path.display().to_string()));
        }
        self.save(&AppConfig::defaults()).await
    }
}
