//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::artifact::ContainerFormat;
use crate::domain::config::capture::{
    AcquisitionMode, AudioBackend, AudioSource, CaptureConfig, DeviceSelection, PipelineMode,
    DEFAULT_REFRESH_RATE,
};
use crate::domain::media::VideoConstraints;
use crate::domain::recording::Duration;

/// Linux device configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinuxConfig {
    pub video_device: Option<String>,
    pub audio_backend: Option<String>,
    pub audio_device: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<u32>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub duration: Option<String>,
    pub max_duration: Option<String>,
    pub pipeline: Option<String>,
    pub audio_source: Option<String>,
    pub acquisition: Option<String>,
    pub format: Option<String>,
    pub output_dir: Option<String>,
    pub refresh_rate: Option<u32>,
    pub linux: Option<LinuxConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        let video = VideoConstraints::default();
        let devices = DeviceSelection::default();
        Self {
            duration: None,
            max_duration: Some("10m".to_string()),
            pipeline: Some(PipelineMode::default().to_string()),
            audio_source: Some(AudioSource::default().to_string()),
            acquisition: Some(AcquisitionMode::default().to_string()),
            format: Some(ContainerFormat::default().to_string()),
            output_dir: Some(".".to_string()),
            refresh_rate: Some(DEFAULT_REFRESH_RATE),
            linux: Some(LinuxConfig {
                video_device: Some(devices.video_device),
                audio_backend: Some(devices.audio_backend.to_string()),
                audio_device: Some(devices.audio_device),
                width: Some(video.width),
                height: Some(video.height),
                frame_rate: Some(video.frame_rate),
            }),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            duration: other.duration.or(self.duration),
            max_duration: other.max_duration.or(self.max_duration),
            pipeline: other.pipeline.or(self.pipeline),
            audio_source: other.audio_source.or(self.audio_source),
            acquisition: other.acquisition.or(self.acquisition),
            format: other.format.or(self.format),
            output_dir: other.output_dir.or(self.output_dir),
            refresh_rate: other.refresh_rate.or(self.refresh_rate),
            linux: Self::merge_linux_config(self.linux, other.linux),
        }
    }

    fn merge_linux_config(
        base: Option<LinuxConfig>,
        other: Option<LinuxConfig>,
    ) -> Option<LinuxConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(LinuxConfig {
                video_device: o.video_device.or(b.video_device),
                audio_backend: o.audio_backend.or(b.audio_backend),
                audio_device: o.audio_device.or(b.audio_device),
                width: o.width.or(b.width),
                height: o.height.or(b.height),
                frame_rate: o.frame_rate.or(b.frame_rate),
            }),
        }
    }

    /// Recording length, if one is configured and valid
    pub fn duration(&self) -> Option<Duration> {
        self.duration.as_ref().and_then(|s| s.parse().ok())
    }

    /// Get max_duration as parsed Duration, or default if not set/invalid
    pub fn max_duration_or_default(&self) -> Duration {
        self.max_duration
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_max_duration)
    }

    pub fn pipeline_or_default(&self) -> PipelineMode {
        parse_or_default(self.pipeline.as_deref())
    }

    pub fn audio_source_or_default(&self) -> AudioSource {
        parse_or_default(self.audio_source.as_deref())
    }

    pub fn acquisition_or_default(&self) -> AcquisitionMode {
        parse_or_default(self.acquisition.as_deref())
    }

    pub fn format_or_default(&self) -> ContainerFormat {
        parse_or_default(self.format.as_deref())
    }

    /// Output directory, or the working directory if not set
    pub fn output_dir_or_default(&self) -> PathBuf {
        self.output_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Refresh rate in Hz; zero falls back to the default
    pub fn refresh_rate_or_default(&self) -> u32 {
        self.refresh_rate
            .filter(|&hz| hz > 0)
            .unwrap_or(DEFAULT_REFRESH_RATE)
    }

    pub fn video_constraints(&self) -> VideoConstraints {
        let defaults = VideoConstraints::default();
        let linux = self.linux.as_ref();
        let pick = |f: fn(&LinuxConfig) -> Option<u32>, fallback: u32| {
            linux.and_then(f).filter(|&v| v > 0).unwrap_or(fallback)
        };
        VideoConstraints {
            width: pick(|l| l.width, defaults.width),
            height: pick(|l| l.height, defaults.height),
            frame_rate: pick(|l| l.frame_rate, defaults.frame_rate),
        }
    }

    pub fn device_selection(&self) -> DeviceSelection {
        let defaults = DeviceSelection::default();
        let Some(linux) = self.linux.as_ref() else {
            return defaults;
        };
        DeviceSelection {
            video_device: linux.video_device.clone().unwrap_or(defaults.video_device),
            audio_backend: parse_or_default::<AudioBackend>(linux.audio_backend.as_deref()),
            audio_device: linux.audio_device.clone().unwrap_or(defaults.audio_device),
        }
    }

    /// Resolve into the options the capture core runs with
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            pipeline: self.pipeline_or_default(),
            audio_source: self.audio_source_or_default(),
            acquisition: self.acquisition_or_default(),
            format: self.format_or_default(),
            video: self.video_constraints(),
            refresh_rate: self.refresh_rate_or_default(),
        }
    }
}

fn parse_or_default<T: std::str::FromStr + Default>(value: Option<&str>) -> T {
    value.and_then(|s| s.parse().ok()).unwrap_or_default()
}
