//! FFmpeg-based media recorder adapter
//!
//! One ffmpeg process muxes every track of the stream into the container and
//! writes it to stdout; a pump task turns stdout reads into `DataAvailable`
//! events in output order. Compositor surfaces are fed to stdin as raw RGBA.

use std::process::Stdio;
use std::time::Duration as StdDuration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::{oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::application::ports::{
    MediaRecorder, MediaRecorderFactory, RecorderError, RecorderEventSink, RecorderState,
};
use crate::domain::artifact::ContainerFormat;
use crate::domain::media::{FrameFeed, MediaStream, MediaTrack, TrackSource, VideoFrame};

use super::{interrupt, session_command, stderr_tail, FFMPEG_BINARY};

/// Bytes requested per stdout read; each read becomes one fragment
const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Raw RGBA frames written to ffmpeg's stdin
#[derive(Clone)]
struct SurfaceInput {
    feed: FrameFeed,
    width: u32,
    height: u32,
    frame_rate: u32,
}

/// Command line plus the optional stdin feed for one recording
#[derive(Clone)]
struct EncodePlan {
    args: Vec<String>,
    surface: Option<SurfaceInput>,
}

impl EncodePlan {
    fn for_stream(stream: &MediaStream, format: ContainerFormat) -> Result<Self, RecorderError> {
        let video = stream.video_tracks().next();
        let audio = stream.audio_tracks().next();
        if video.is_none() && audio.is_none() {
            return Err(RecorderError::Unsupported("stream has no tracks".to_string()));
        }

        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(String::from)
            .collect();
        let mut surface = None;
        let mut maps = Vec::new();
        let mut input_index = 0;

        if let Some(track) = video {
            match track.source() {
                TrackSource::Device { format, input } => {
                    args.extend(["-f".to_string(), format.clone()]);
                    if let Some(rate) = track.settings().frame_rate {
                        args.extend(["-framerate".to_string(), rate.to_string()]);
                    }
                    if let Some((w, h)) = track.settings().dimensions() {
                        args.extend(["-video_size".to_string(), format!("{}x{}", w, h)]);
                    }
                    args.extend(["-i".to_string(), input.clone()]);
                }
                TrackSource::Surface(feed) => {
                    let input = Self::surface_input(track, feed.clone())?;
                    args.extend([
                        "-f".to_string(),
                        "rawvideo".to_string(),
                        "-pix_fmt".to_string(),
                        "rgba".to_string(),
                        "-video_size".to_string(),
                        format!("{}x{}", input.width, input.height),
                        "-framerate".to_string(),
                        input.frame_rate.to_string(),
                        "-i".to_string(),
                        "pipe:0".to_string(),
                    ]);
                    surface = Some(input);
                }
            }
            maps.push(format!("{}:v", input_index));
            input_index += 1;
        }

        if let Some(track) = audio {
            match track.source() {
                TrackSource::Device { format, input } => {
                    args.extend([
                        "-f".to_string(),
                        format.clone(),
                        "-i".to_string(),
                        input.clone(),
                    ]);
                }
                TrackSource::Surface(_) => {
                    return Err(RecorderError::Unsupported(format!(
                        "audio track '{}' has no device source",
                        track.label()
                    )));
                }
            }
            maps.push(format!("{}:a", input_index));
        }

        if surface.is_none() {
            args.push("-nostdin".to_string());
        }
        for map in maps {
            args.extend(["-map".to_string(), map]);
        }
        args.extend(Self::codec_args(format, video.is_some(), audio.is_some()));
        args.push("pipe:1".to_string());

        Ok(Self { args, surface })
    }

    fn surface_input(track: &MediaTrack, feed: FrameFeed) -> Result<SurfaceInput, RecorderError> {
        let (width, height) = track.settings().dimensions().ok_or_else(|| {
            RecorderError::Unsupported(format!("surface track '{}' has no dimensions", track.label()))
        })?;
        Ok(SurfaceInput {
            feed,
            width,
            height,
            frame_rate: track.settings().frame_rate.unwrap_or(30).max(1),
        })
    }

    fn codec_args(format: ContainerFormat, video: bool, audio: bool) -> Vec<String> {
        let mut args: Vec<&str> = Vec::new();
        match format {
            ContainerFormat::Webm => {
                if video {
                    args.extend(["-c:v", "libvpx", "-deadline", "realtime", "-cpu-used", "8", "-b:v", "1M"]);
                }
                if audio {
                    args.extend(["-c:a", "libopus"]);
                }
                args.extend(["-f", "webm"]);
            }
            ContainerFormat::Mp4 => {
                if video {
                    args.extend(["-c:v", "libx264", "-preset", "veryfast", "-pix_fmt", "yuv420p"]);
                }
                if audio {
                    args.extend(["-c:a", "aac"]);
                }
                args.extend([
                    "-movflags",
                    "frag_keyframe+empty_moov+default_base_moof",
                    "-f",
                    "mp4",
                ]);
            }
        }
        args.into_iter().map(String::from).collect()
    }
}

/// Creates one ffmpeg recorder per session generation
pub struct FfmpegRecorderFactory {
    binary: String,
    chunk_size: usize,
}

impl FfmpegRecorderFactory {
    pub fn new() -> Self {
        Self::with_binary(FFMPEG_BINARY)
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl Default for FfmpegRecorderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaRecorderFactory for FfmpegRecorderFactory {
    fn create(
        &self,
        stream: &MediaStream,
        format: ContainerFormat,
        sink: RecorderEventSink,
    ) -> Result<Box<dyn MediaRecorder>, RecorderError> {
        let plan = EncodePlan::for_stream(stream, format)?;
        tracing::debug!(args = %plan.args.join(" "), "ffmpeg recorder planned");
        Ok(Box::new(FfmpegRecorder {
            binary: self.binary.clone(),
            chunk_size: self.chunk_size,
            plan,
            sink,
            state: RecorderState::Inactive,
            stop_tx: None,
        }))
    }
}

/// One ffmpeg encoding process. Dropping the recorder has the same effect as `stop`.
pub struct FfmpegRecorder {
    binary: String,
    chunk_size: usize,
    plan: EncodePlan,
    sink: RecorderEventSink,
    state: RecorderState,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl FfmpegRecorder {
    fn spawn_ffmpeg(&self) -> Result<Child, RecorderError> {
        let stdin = if self.plan.surface.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        session_command(&self.binary)
            .args(&self.plan.args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RecorderError::StartFailed(format!("{} not found", self.binary))
                } else {
                    RecorderError::StartFailed(e.to_string())
                }
            })
    }
}

impl MediaRecorder for FfmpegRecorder {
    fn start(&mut self) -> Result<(), RecorderError> {
        if self.state != RecorderState::Inactive {
            return Err(RecorderError::InvalidState {
                action: "start",
                state: self.state,
            });
        }

        let mut child = self.spawn_ffmpeg()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RecorderError::StartFailed("ffmpeg has no output pipe".to_string()))?;
        let stderr = child.stderr.take();
        let (stop_tx, stop_rx) = oneshot::channel();
        let (feeder_stop, feeder_stopped) = watch::channel(false);

        if let (Some(stdin), Some(surface)) = (child.stdin.take(), self.plan.surface.clone()) {
            tokio::spawn(feed_surface(stdin, surface, feeder_stopped));
        }
        tokio::spawn(pump(
            child,
            stdout,
            stderr,
            stop_rx,
            feeder_stop,
            self.sink.clone(),
            self.chunk_size,
        ));

        self.stop_tx = Some(stop_tx);
        self.state = RecorderState::Recording;
        tracing::info!(generation = self.sink.generation(), "ffmpeg recorder started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecorderError> {
        if self.state != RecorderState::Recording {
            return Err(RecorderError::InvalidState {
                action: "stop",
                state: self.state,
            });
        }
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        self.state = RecorderState::Stopping;
        Ok(())
    }

    fn state(&self) -> RecorderState {
        self.state
    }
}

/// Forward stdout to the sink until ffmpeg exits. A stop request (or the
/// recorder being dropped) interrupts ffmpeg so it flushes the container.
async fn pump(
    mut child: Child,
    mut stdout: ChildStdout,
    stderr: Option<ChildStderr>,
    mut stop_rx: oneshot::Receiver<()>,
    feeder_stop: watch::Sender<bool>,
    sink: RecorderEventSink,
    chunk_size: usize,
) {
    let stderr_task = tokio::spawn(stderr_tail(stderr));
    let mut buf = vec![0u8; chunk_size];
    let mut stop_requested = false;

    loop {
        tokio::select! {
            read = stdout.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    sink.data(buf[..n].to_vec());
                }
                Err(e) => {
                    sink.error(format!("reading encoder output failed: {}", e));
                    break;
                }
            },
            _ = &mut stop_rx, if !stop_requested => {
                stop_requested = true;
                let _ = feeder_stop.send(true);
                if let Err(e) = interrupt(&mut child) {
                    tracing::warn!(error = %e, "failed to interrupt ffmpeg");
                }
            }
        }
    }

    let _ = feeder_stop.send(true);
    let status = child.wait().await;
    let tail = stderr_task.await.unwrap_or_default();
    match status {
        Ok(status) if status.success() || stop_requested => {
            tracing::debug!(%status, "ffmpeg exited");
        }
        Ok(status) => {
            sink.error(format!("ffmpeg exited with {}: {}", status, tail));
        }
        Err(e) => {
            sink.error(format!("waiting for ffmpeg failed: {}", e));
        }
    }
    sink.stopped();
}

/// Write the latest surface frame to ffmpeg once per frame period.
async fn feed_surface(mut stdin: ChildStdin, surface: SurfaceInput, mut stop: watch::Receiver<bool>) {
    let blank = vec![0u8; VideoFrame::byte_len(surface.width, surface.height)];
    let period = StdDuration::from_secs_f64(1.0 / f64::from(surface.frame_rate));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = surface.feed.borrow().clone();
                let bytes = match frame.as_ref() {
                    Some(f) if f.width() == surface.width && f.height() == surface.height => f.data(),
                    _ => blank.as_slice(),
                };
                if stdin.write_all(bytes).await.is_err() {
                    break;
                }
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }
    // Closing stdin lets ffmpeg see end of input.
    drop(stdin);
}
