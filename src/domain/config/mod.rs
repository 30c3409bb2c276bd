//! Configuration domain module

mod app_config;
mod capture;

pub use app_config::{AppConfig, LinuxConfig};
pub use capture::{
    AcquisitionMode, AudioBackend, AudioSource, CaptureConfig, DeviceSelection, PipelineMode,
    DEFAULT_REFRESH_RATE,
};
