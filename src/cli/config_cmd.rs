//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::artifact::ContainerFormat;
use crate::domain::config::{
    AcquisitionMode, AppConfig, AudioBackend, AudioSource, LinuxConfig, PipelineMode,
};
use crate::domain::error::ConfigError;
use crate::domain::recording::Duration;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

fn require_known_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    require_known_key(key)?;
    validate_config_value(key, value)?;

    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

/// Store an already validated value under `key`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let text = Some(value.to_string());
    let number = || parse_positive(key, value).map(Some);

    match key {
        "duration" => config.duration = text,
        "max_duration" => config.max_duration = text,
        "pipeline" => config.pipeline = text,
        "audio_source" => config.audio_source = text,
        "acquisition" => config.acquisition = text,
        "format" => config.format = text,
        "output_dir" => config.output_dir = text,
        "refresh_rate" => config.refresh_rate = number()?,
        _ => {
            let linux = config.linux.get_or_insert_with(LinuxConfig::default);
            match key {
                "linux.video_device" => linux.video_device = text,
                "linux.audio_backend" => linux.audio_backend = text,
                "linux.audio_device" => linux.audio_device = text,
                "linux.width" => linux.width = number()?,
                "linux.height" => linux.height = number()?,
                "linux.frame_rate" => linux.frame_rate = number()?,
                _ => return require_known_key(key),
            }
        }
    }
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    require_known_key(key)?;

    let config = store.load().await?;
    match lookup(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output("(not set)"),
    }

    Ok(())
}

/// Current value of `key` as text
fn lookup(config: &AppConfig, key: &str) -> Option<String> {
    let linux = config.linux.as_ref();
    match key {
        "duration" => config.duration.clone(),
        "max_duration" => config.max_duration.clone(),
        "pipeline" => config.pipeline.clone(),
        "audio_source" => config.audio_source.clone(),
        "acquisition" => config.acquisition.clone(),
        "format" => config.format.clone(),
        "output_dir" => config.output_dir.clone(),
        "refresh_rate" => config.refresh_rate.map(|n| n.to_string()),
        "linux.video_device" => linux.and_then(|l| l.video_device.clone()),
        "linux.audio_backend" => linux.and_then(|l| l.audio_backend.clone()),
        "linux.audio_device" => linux.and_then(|l| l.audio_device.clone()),
        "linux.width" => linux.and_then(|l| l.width).map(|n| n.to_string()),
        "linux.height" => linux.and_then(|l| l.height).map(|n| n.to_string()),
        "linux.frame_rate" => linux.and_then(|l| l.frame_rate).map(|n| n.to_string()),
        _ => None,
    }
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        let value = lookup(&config, key).unwrap_or_else(|| "(not set)".to_string());
        presenter.key_value(key, &value);
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

/// Validate a config value based on key type
fn validate_config_value(key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::ValidationError {
        key: key.to_string(),
        message,
    };

    match key {
        "duration" | "max_duration" => {
            value
                .parse::<Duration>()
                .map_err(|e| invalid(e.to_string()))?;
        }
        "pipeline" => {
            value.parse::<PipelineMode>().map_err(invalid)?;
        }
        "audio_source" => {
            value.parse::<AudioSource>().map_err(invalid)?;
        }
        "acquisition" => {
            value.parse::<AcquisitionMode>().map_err(invalid)?;
        }
        "format" => {
            value.parse::<ContainerFormat>().map_err(invalid)?;
        }
        "linux.audio_backend" => {
            value.parse::<AudioBackend>().map_err(invalid)?;
        }
        "refresh_rate" | "linux.width" | "linux.height" | "linux.frame_rate" => {
            parse_positive(key, value)?;
        }
        "output_dir" | "linux.video_device" | "linux.audio_device" => {
            if value.trim().is_empty() {
                return Err(invalid("Value must not be empty".to_string()));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Parse a positive integer value
fn parse_positive(key: &str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: "Value must be a positive integer".to_string(),
        }),
    }
}
