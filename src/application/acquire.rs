//! Stream acquisition pipeline

use crate::domain::config::{AudioSource, CaptureConfig};
use crate::domain::error::CaptureError;
use crate::domain::media::{MediaConstraints, MediaStream, MediaTrack};

use super::combiner::combine;
use super::compositor::Compositor;
use super::services::CaptureServices;

/// Everything one session acquired, plus the stream handed to the recorder.
///
/// Dropping this cancels the render loop and then stops every registered
/// track, so any exit path releases the hardware.
#[derive(Default)]
pub struct CaptureSources {
    streams: Vec<MediaStream>,
    compositor: Option<Compositor>,
    recordable: Option<MediaStream>,
}

impl CaptureSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources for a stream that is recorded as-is.
    pub fn direct(stream: MediaStream) -> Self {
        let mut sources = Self::new();
        sources.register(stream.clone());
        sources.recordable = Some(stream);
        sources
    }

    /// Track `stream` for teardown.
    pub fn register(&mut self, stream: MediaStream) {
        tracing::debug!(stream = %stream.id(), tracks = stream.tracks().len(), "stream registered");
        self.streams.push(stream);
    }

    pub fn attach_compositor(&mut self, compositor: Compositor) {
        self.compositor = Some(compositor);
    }

    pub fn set_recordable(&mut self, stream: MediaStream) {
        self.recordable = Some(stream);
    }

    pub fn recordable(&self) -> Option<&MediaStream> {
        self.recordable.as_ref()
    }

    /// Every registered track, raw and derived
    pub fn tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.streams
            .iter()
            .chain(self.compositor.as_ref().map(Compositor::stream))
            .flat_map(|s| s.tracks())
    }

    /// False once any registered track has ended, e.g. the device was unplugged
    pub fn is_live(&self) -> bool {
        self.tracks().all(MediaTrack::is_live)
    }

    pub fn release(self) {
        tracing::debug!(
            streams = self.streams.len(),
            composited = self.compositor.is_some(),
            "releasing capture sources"
        );
        drop(self);
    }
}

impl Drop for CaptureSources {
    fn drop(&mut self) {
        if let Some(mut compositor) = self.compositor.take() {
            compositor.cancel();
        }
        let stopped: usize = self.streams.iter().map(MediaStream::stop_all).sum();
        if let Some(recordable) = self.recordable.take() {
            recordable.stop_all();
        }
        if stopped > 0 {
            tracing::debug!(tracks = stopped, "capture tracks stopped");
        }
    }
}

/// Open the devices and build the recordable stream the configuration asks for.
///
/// With a separate audio source the audio-only stream is opened first; if the
/// video acquisition then fails, the audio stream is stopped before returning.
pub async fn acquire_sources(
    services: &CaptureServices,
    config: &CaptureConfig,
) -> Result<CaptureSources, CaptureError> {
    let mut sources = CaptureSources::new();

    let (video_stream, audio_stream) = match config.audio_source {
        AudioSource::Raw => {
            let raw = services
                .devices
                .acquire(&MediaConstraints::audio_video(config.video))
                .await?;
            sources.register(raw.clone());
            (raw.clone(), raw)
        }
        AudioSource::Separate => {
            let audio = services
                .devices
                .acquire(&MediaConstraints::audio_only())
                .await?;
            sources.register(audio.clone());
            let video = services
                .devices
                .acquire(&MediaConstraints::video_only(config.video))
                .await?;
            sources.register(video.clone());
            (video, audio)
        }
    };

    let visual = if config.is_composited() {
        let raw_video = video_stream.video_tracks().next().cloned().ok_or_else(|| {
            CaptureError::DeviceUnavailable("acquired stream has no video track".to_string())
        })?;
        let playback = services.frames.play(&raw_video).await?;
        let compositor = Compositor::start(&raw_video, playback, config.refresh_rate)?;
        let derived = compositor.stream().clone();
        sources.attach_compositor(compositor);
        derived
    } else {
        video_stream
    };

    let recordable = if config.needs_combiner() {
        combine(&visual, &audio_stream)
    } else {
        visual
    };
    tracing::info!(
        pipeline = %config.pipeline,
        audio = %config.audio_source,
        tracks = recordable.tracks().len(),
        "capture sources ready"
    );
    sources.set_recordable(recordable);

    Ok(sources)
}
