//! V4L2 camera and cpal microphone acquisition
//!
//! The camera node is opened and held for the lifetime of the video track so
//! that busy or forbidden devices fail at acquisition time. The microphone is
//! resolved through cpal to learn its native format; the encoder opens it by
//! name through the configured audio backend.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::application::ports::{DeviceError, MediaDevices};
use crate::domain::config::DeviceSelection;
use crate::domain::media::{
    MediaConstraints, MediaStream, MediaTrack, TrackKind, TrackSettings, TrackSource,
    VideoConstraints,
};

const V4L2_FORMAT: &str = "v4l2";
const DEFAULT_AUDIO_DEVICE: &str = "default";

/// Linux capture devices
pub struct LinuxMediaDevices {
    selection: DeviceSelection,
}

impl LinuxMediaDevices {
    pub fn new(selection: DeviceSelection) -> Self {
        Self { selection }
    }

    pub fn selection(&self) -> &DeviceSelection {
        &self.selection
    }

    async fn open_camera(&self, video: VideoConstraints) -> Result<MediaTrack, DeviceError> {
        let path = self.selection.video_device.clone();
        let file = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || open_video_node(Path::new(&path)))
                .await
                .map_err(|e| DeviceError::Failed(format!("camera open task failed: {}", e)))??
        };

        tracing::debug!(device = %path, width = video.width, height = video.height, "camera opened");
        Ok(MediaTrack::with_release(
            TrackKind::Video,
            path.clone(),
            TrackSettings::video(video.width, video.height, video.frame_rate),
            TrackSource::Device {
                format: V4L2_FORMAT.to_string(),
                input: path,
            },
            move || drop(file),
        ))
    }

    async fn open_microphone(&self) -> Result<MediaTrack, DeviceError> {
        let name = self.selection.audio_device.clone();
        let settings = {
            let name = name.clone();
            tokio::task::spawn_blocking(move || microphone_settings(&name))
                .await
                .map_err(|e| DeviceError::Failed(format!("microphone lookup task failed: {}", e)))??
        };

        tracing::debug!(
            device = %name,
            backend = %self.selection.audio_backend,
            sample_rate = ?settings.sample_rate,
            "microphone resolved"
        );
        Ok(MediaTrack::new(
            TrackKind::Audio,
            name.clone(),
            settings,
            TrackSource::Device {
                format: self.selection.audio_backend.as_str().to_string(),
                input: name,
            },
        ))
    }
}

impl Default for LinuxMediaDevices {
    fn default() -> Self {
        Self::new(DeviceSelection::default())
    }
}

#[async_trait]
impl MediaDevices for LinuxMediaDevices {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream, DeviceError> {
        let mut tracks = Vec::new();

        if let Some(video) = constraints.video {
            tracks.push(self.open_camera(video).await?);
        }

        if constraints.audio {
            match self.open_microphone().await {
                Ok(track) => tracks.push(track),
                Err(e) => {
                    for track in &tracks {
                        track.stop();
                    }
                    return Err(e);
                }
            }
        }

        Ok(MediaStream::new(tracks))
    }
}

fn open_video_node(path: &Path) -> Result<File, DeviceError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| classify_open_error(path, e))
}

fn classify_open_error(path: &Path, err: io::Error) -> DeviceError {
    let device = path.display().to_string();
    match err.kind() {
        io::ErrorKind::NotFound => DeviceError::NotFound(device),
        io::ErrorKind::PermissionDenied => DeviceError::Denied(device),
        _ if is_busy(&err) => DeviceError::Busy(device),
        _ => DeviceError::Failed(format!("{}: {}", device, err)),
    }
}

#[cfg(unix)]
fn is_busy(err: &io::Error) -> bool {
    err.raw_os_error() == Some(nix::errno::Errno::EBUSY as i32)
}

#[cfg(not(unix))]
fn is_busy(_err: &io::Error) -> bool {
    false
}

/// Native format of the named input device, or of the default input.
///
/// Backend-specific names (PulseAudio sources) are not visible to cpal; those
/// fall back to the default input's format as long as one exists.
fn microphone_settings(name: &str) -> Result<TrackSettings, DeviceError> {
    let host = cpal::default_host();
    let named = if name == DEFAULT_AUDIO_DEVICE {
        None
    } else {
        host.input_devices()
            .ok()
            .and_then(|mut devices| devices.find(|d| d.name().map(|n| n == name).unwrap_or(false)))
    };

    let device = match named {
        Some(device) => device,
        None => host
            .default_input_device()
            .ok_or_else(|| DeviceError::NotFound("no audio input device".to_string()))?,
    };

    let config = device
        .default_input_config()
        .map_err(|e| DeviceError::Failed(format!("microphone config: {}", e)))?;
    Ok(TrackSettings::audio(config.sample_rate().0, config.channels()))
}
