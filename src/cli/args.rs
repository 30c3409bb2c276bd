//! CLI argument definitions using Clap

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::domain::artifact::ContainerFormat;
use crate::domain::config::{AppConfig, LinuxConfig};

/// Camcorder - record the webcam and microphone to a validated container file
#[derive(Parser, Debug)]
#[command(name = "camcorder")]
#[command(version)]
#[command(about = "Record webcam and microphone to a validated WebM or MP4 file")]
#[command(long_about = None)]
pub struct Cli {
    /// Stop automatically after this long (e.g., 10s, 1m, 2m30s)
    #[arg(short = 'd', long, value_name = "TIME")]
    pub duration: Option<String>,

    /// Safety limit for recordings without --duration
    #[arg(long, value_name = "TIME")]
    pub max_duration: Option<String>,

    /// Record through the compositor surface instead of the raw camera stream
    #[arg(long)]
    pub composite: bool,

    /// Capture audio through a separate audio-only acquisition
    #[arg(long)]
    pub separate_audio: bool,

    /// Open devices as soon as the session starts
    #[arg(long)]
    pub eager: bool,

    /// Container format
    #[arg(short = 'f', long, value_name = "FORMAT")]
    pub format: Option<FormatArg>,

    /// Directory the recording is saved to
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<String>,

    /// Compositor redraw rate in Hz
    #[arg(long, value_name = "HZ")]
    pub refresh_rate: Option<u32>,

    /// Camera device node
    #[arg(long, value_name = "PATH")]
    pub video_device: Option<String>,

    /// Audio input name understood by the audio backend
    #[arg(long, value_name = "NAME")]
    pub audio_device: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Config layer built from the flags that were given
    pub fn to_config(&self) -> AppConfig {
        let linux = if self.video_device.is_some() || self.audio_device.is_some() {
            Some(LinuxConfig {
                video_device: self.video_device.clone(),
                audio_device: self.audio_device.clone(),
                ..Default::default()
            })
        } else {
            None
        };

        AppConfig {
            duration: self.duration.clone(),
            max_duration: self.max_duration.clone(),
            pipeline: self.composite.then(|| "composited".to_string()),
            audio_source: self.separate_audio.then(|| "separate".to_string()),
            acquisition: self.eager.then(|| "eager".to_string()),
            format: self.format.map(|f| ContainerFormat::from(f).to_string()),
            output_dir: self.output.clone(),
            refresh_rate: self.refresh_rate,
            linux,
        }
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check recorder capability and device permissions
    Check,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Container format argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Webm,
    Mp4,
}

impl From<FormatArg> for ContainerFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Webm => ContainerFormat::Webm,
            FormatArg::Mp4 => ContainerFormat::Mp4,
        }
    }
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "duration",
    "max_duration",
    "pipeline",
    "audio_source",
    "acquisition",
    "format",
    "output_dir",
    "refresh_rate",
    "linux.video_device",
    "linux.audio_backend",
    "linux.audio_device",
    "linux.width",
    "linux.height",
    "linux.frame_rate",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
