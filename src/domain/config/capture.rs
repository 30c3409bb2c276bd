//! Capture pipeline options

use std::fmt;
use std::str::FromStr;

use crate::domain::artifact::ContainerFormat;
use crate::domain::media::VideoConstraints;

/// Default compositor refresh rate (Hz)
pub const DEFAULT_REFRESH_RATE: u32 = 60;

macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? } default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[doc = $text]
                $variant,
            )+
        }

        impl $name {
            pub const NAMES: &'static [&'static str] = &[$($text),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        "unknown value '{}'. Valid options: {}",
                        other,
                        Self::NAMES.join(", ")
                    )),
                }
            }
        }
    };
}

option_enum! {
    /// Whether the recorder reads the raw device stream or a compositor surface.
    PipelineMode { Direct => "direct", Composited => "composited" } default Direct
}

option_enum! {
    /// Where the recorded audio comes from.
    AudioSource { Raw => "raw", Separate => "separate" } default Raw
}

option_enum! {
    /// When devices are opened: on the first `start` or as soon as the session exists.
    AcquisitionMode { Lazy => "lazy", Eager => "eager" } default Lazy
}

option_enum! {
    /// Audio capture backend understood by the encoder.
    AudioBackend { Pulse => "pulse", Alsa => "alsa" } default Pulse
}

/// Everything the capture core needs to know about one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub pipeline: PipelineMode,
    pub audio_source: AudioSource,
    pub acquisition: AcquisitionMode,
    pub format: ContainerFormat,
    pub video: VideoConstraints,
    pub refresh_rate: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineMode::default(),
            audio_source: AudioSource::default(),
            acquisition: AcquisitionMode::default(),
            format: ContainerFormat::default(),
            video: VideoConstraints::default(),
            refresh_rate: DEFAULT_REFRESH_RATE,
        }
    }
}

impl CaptureConfig {
    pub fn is_composited(&self) -> bool {
        self.pipeline == PipelineMode::Composited
    }

    /// Separate audio or a compositor surface means the recorder gets a combined stream.
    pub fn needs_combiner(&self) -> bool {
        self.is_composited() || self.audio_source == AudioSource::Separate
    }
}

/// Which devices the platform layer opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelection {
    pub video_device: String,
    pub audio_backend: AudioBackend,
    pub audio_device: String,
}

impl Default for DeviceSelection {
    fn default() -> Self {
        Self {
            video_device: "/dev/video0".to_string(),
            audio_backend: AudioBackend::default(),
            audio_device: "default".to_string(),
        }
    }
}
