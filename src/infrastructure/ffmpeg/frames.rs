//! Decode a device video track into RGBA frames for the compositor

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use crate::application::ports::{DeviceError, FramePlayer, Playback};
use crate::domain::media::{frame_channel, MediaTrack, TrackSource, VideoFrame};

use super::{session_command, FFMPEG_BINARY};

pub struct FfmpegFramePlayer {
    binary: String,
}

impl FfmpegFramePlayer {
    pub fn new() -> Self {
        Self::with_binary(FFMPEG_BINARY)
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn decode_args(format: &str, input: &str, width: u32, height: u32, frame_rate: u32) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-f".to_string(),
            format.to_string(),
            "-framerate".to_string(),
            frame_rate.to_string(),
            "-video_size".to_string(),
            format!("{}x{}", width, height),
            "-i".to_string(),
            input.to_string(),
            "-vf".to_string(),
            format!("scale={}:{}", width, height),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgba".to_string(),
            "pipe:1".to_string(),
        ]
    }
}

impl Default for FfmpegFramePlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FramePlayer for FfmpegFramePlayer {
    async fn play(&self, track: &MediaTrack) -> Result<Playback, DeviceError> {
        let (format, input) = match track.source() {
            TrackSource::Surface(feed) => return Ok(Playback::passthrough(feed.clone())),
            TrackSource::Device { format, input } => (format, input),
        };
        let (width, height) = track.settings().dimensions().ok_or_else(|| {
            DeviceError::Failed(format!("video track '{}' reports no dimensions", track.label()))
        })?;
        let frame_rate = track.settings().frame_rate.unwrap_or(30);

        let mut child = session_command(&self.binary)
            .args(Self::decode_args(format, input, width, height, frame_rate))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeviceError::Failed(format!("cannot start {}: {}", self.binary, e)))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| DeviceError::Failed("decoder has no output pipe".to_string()))?;

        let (tx, feed) = frame_channel();
        let frame_len = VideoFrame::byte_len(width, height);
        let decoder = tokio::spawn(async move {
            // Owns the child so aborting this task kills the decoder.
            let _child = child;
            let mut buf = vec![0u8; frame_len];
            while stdout.read_exact(&mut buf).await.is_ok() {
                let Some(frame) = VideoFrame::from_rgba(width, height, buf.clone()) else {
                    break;
                };
                if tx.send(Some(frame)).is_err() {
                    break;
                }
            }
            tracing::debug!("frame decoder finished");
        });

        tracing::debug!(input = %input, width, height, frame_rate, "frame decoder started");
        Ok(Playback::new(feed, move || decoder.abort()))
    }
}
