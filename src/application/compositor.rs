//! Compositor: repaints a live video track onto an off-screen surface and
//! exposes the surface as a new capturable stream.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use tiny_skia::{Color, FilterQuality, IntSize, Pixmap, PixmapPaint, Transform};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::domain::error::CaptureError;
use crate::domain::media::{
    frame_channel, FrameFeed, MediaStream, MediaTrack, TrackKind, TrackSettings, TrackSource,
    VideoFrame,
};

use super::ports::Playback;

/// Off-screen drawing surface with dimensions fixed at creation.
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Pixmap::new(width, height).map(|pixmap| Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Paint one frame: clear to black, then draw `frame` scaled to fill the surface.
    pub fn draw(&mut self, frame: Option<&VideoFrame>) {
        self.pixmap.fill(Color::BLACK);

        let Some(frame) = frame else {
            return;
        };
        let Some(source) = IntSize::from_wh(frame.width(), frame.height())
            .and_then(|size| Pixmap::from_vec(frame.data().to_vec(), size))
        else {
            return;
        };

        let sx = self.width() as f32 / frame.width() as f32;
        let sy = self.height() as f32 / frame.height() as f32;
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            Transform::from_scale(sx, sy),
            None,
        );
    }

    pub fn snapshot(&self) -> Option<VideoFrame> {
        VideoFrame::from_rgba(self.width(), self.height(), self.pixmap.data().to_vec())
    }
}

/// Repeating draw task. Holds exactly one spawned task; cancelling it (or
/// dropping the handle) stops drawing before the next frame.
pub struct RenderLoop {
    cancelled: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl RenderLoop {
    pub fn spawn(
        mut surface: Surface,
        input: FrameFeed,
        output: watch::Sender<Option<VideoFrame>>,
        refresh_rate: u32,
    ) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));
        let period = StdDuration::from_secs_f64(1.0 / f64::from(refresh_rate.max(1)));

        let flag = Arc::clone(&cancelled);
        let counter = Arc::clone(&frames);
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                let latest = input.borrow().clone();
                surface.draw(latest.as_ref());
                if let Some(frame) = surface.snapshot() {
                    output.send_replace(Some(frame));
                }
                counter.fetch_add(1, Ordering::SeqCst);
            }
            tracing::trace!("render loop exited");
        });

        Self {
            cancelled,
            frames,
            task,
        }
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.task.abort();
            tracing::debug!(frames = self.frames_drawn(), "render loop cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A running compositor: the input playback, the render loop and the derived
/// stream whose single video track carries the surface.
pub struct Compositor {
    stream: MediaStream,
    render: RenderLoop,
    playback: Option<Playback>,
}

impl Compositor {
    /// Size the surface from `input`'s reported dimensions and start painting.
    pub fn start(
        input: &MediaTrack,
        playback: Playback,
        refresh_rate: u32,
    ) -> Result<Self, CaptureError> {
        let (width, height) = input.settings().dimensions().ok_or_else(|| {
            CaptureError::DeviceUnavailable(format!(
                "video track '{}' reports no dimensions",
                input.label()
            ))
        })?;
        let surface = Surface::new(width, height).ok_or_else(|| {
            CaptureError::DeviceUnavailable(format!("cannot allocate a {}x{} surface", width, height))
        })?;

        let (tx, feed) = frame_channel();
        let frame_rate = input.settings().frame_rate.unwrap_or(refresh_rate);
        let track = MediaTrack::new(
            TrackKind::Video,
            "compositor surface",
            TrackSettings::video(width, height, frame_rate),
            TrackSource::Surface(feed),
        );
        let stream = MediaStream::new(vec![track]);
        let render = RenderLoop::spawn(surface, playback.feed(), tx, refresh_rate);

        tracing::info!(width, height, refresh_rate, "compositor started");

        Ok(Self {
            stream,
            render,
            playback: Some(playback),
        })
    }

    /// The derived stream. Carries video only.
    pub fn stream(&self) -> &MediaStream {
        &self.stream
    }

    pub fn frames_drawn(&self) -> u64 {
        self.render.frames_drawn()
    }

    pub fn is_running(&self) -> bool {
        !self.render.is_cancelled()
    }

    /// Stop painting, stop decoding the input and end the surface track.
    pub fn cancel(&mut self) {
        self.render.cancel();
        self.playback.take();
        self.stream.stop_all();
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        self.cancel();
    }
}
