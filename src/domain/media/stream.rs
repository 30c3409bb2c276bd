//! Media streams and their tracks

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::frame::FrameFeed;

/// Track media type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Properties the source reports for a live track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl TrackSettings {
    pub fn video(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            frame_rate: Some(frame_rate),
            ..Self::default()
        }
    }

    pub fn audio(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate: Some(sample_rate),
            channels: Some(channels),
            ..Self::default()
        }
    }

    /// Width and height if both are known and non-zero
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// Where a track's media comes from.
#[derive(Clone)]
pub enum TrackSource {
    /// A device an encoder opens directly: demuxer name plus device path or name
    /// (for example `v4l2` + `/dev/video0`, `pulse` + `default`).
    Device { format: String, input: String },
    /// Frames rendered in-process.
    Surface(FrameFeed),
}

impl fmt::Debug for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device { format, input } => f
                .debug_struct("Device")
                .field("format", format)
                .field("input", input)
                .finish(),
            Self::Surface(_) => f.write_str("Surface"),
        }
    }
}

/// Callback that releases the hardware behind a track.
pub type ReleaseHook = Box<dyn FnOnce() + Send>;

struct TrackInner {
    id: Uuid,
    kind: TrackKind,
    label: String,
    settings: TrackSettings,
    source: TrackSource,
    ended: AtomicBool,
    release: Mutex<Option<ReleaseHook>>,
}

/// Live handle to one audio or video track. Clones share the same track.
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>, settings: TrackSettings, source: TrackSource) -> Self {
        Self::build(kind, label.into(), settings, source, None)
    }

    /// Track whose `release` hook runs exactly once, on the first `stop()`.
    pub fn with_release(
        kind: TrackKind,
        label: impl Into<String>,
        settings: TrackSettings,
        source: TrackSource,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self::build(kind, label.into(), settings, source, Some(Box::new(release)))
    }

    fn build(
        kind: TrackKind,
        label: String,
        settings: TrackSettings,
        source: TrackSource,
        release: Option<ReleaseHook>,
    ) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: Uuid::new_v4(),
                kind,
                label,
                settings,
                source,
                ended: AtomicBool::new(false),
                release: Mutex::new(release),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn settings(&self) -> &TrackSettings {
        &self.inner.settings
    }

    pub fn source(&self) -> &TrackSource {
        &self.inner.source
    }

    pub fn is_live(&self) -> bool {
        !self.inner.ended.load(Ordering::SeqCst)
    }

    /// End the track. Returns `true` only for the call that actually ended it;
    /// any further call is a no-op.
    pub fn stop(&self) -> bool {
        if self.inner.ended.swap(true, Ordering::SeqCst) {
            return false;
        }
        let hook = self
            .inner
            .release
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(release) = hook {
            release();
        }
        tracing::debug!(track = %self.inner.id, kind = %self.inner.kind, label = %self.inner.label, "track stopped");
        true
    }
}

impl PartialEq for MediaTrack {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("label", &self.inner.label)
            .field("settings", &self.inner.settings)
            .field("source", &self.inner.source)
            .field("live", &self.is_live())
            .finish()
    }
}

/// A set of tracks captured together.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: Uuid,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracks,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn has_video(&self) -> bool {
        self.video_tracks().next().is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_tracks().next().is_some()
    }

    /// Whether any track is still live
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(MediaTrack::is_live)
    }

    /// Stop every track; returns how many were live before this call.
    pub fn stop_all(&self) -> usize {
        self.tracks.iter().filter(|t| t.stop()).count()
    }
}
