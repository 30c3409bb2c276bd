//! Raw video frames shared between the compositor and encoders

use std::sync::Arc;

use tokio::sync::watch;

/// One RGBA8 frame. Pixel data is shared, so cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    data: Arc<[u8]>,
}

impl VideoFrame {
    /// Wrap RGBA pixels; returns `None` if the buffer does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != Self::byte_len(width, height) {
            return None;
        }
        Some(Self {
            width,
            height,
            data: Arc::from(data),
        })
    }

    /// Opaque single-color frame
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Option<Self> {
        let pixels = (width as usize) * (height as usize);
        Self::from_rgba(width, height, rgba.repeat(pixels))
    }

    pub const fn byte_len(width: u32, height: u32) -> usize {
        (width as usize) * (height as usize) * 4
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Latest-frame channel. Receivers only ever see the most recent frame.
pub type FrameFeed = watch::Receiver<Option<VideoFrame>>;

/// Create a frame channel with no frame yet.
pub fn frame_channel() -> (watch::Sender<Option<VideoFrame>>, FrameFeed) {
    watch::channel(None)
}
