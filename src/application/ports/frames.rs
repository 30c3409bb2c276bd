//! Frame playback port

use std::fmt;

use async_trait::async_trait;

use crate::domain::media::{FrameFeed, MediaTrack};

use super::devices::DeviceError;

/// A running decode of one video track. Decoding stops when this is dropped.
pub struct Playback {
    feed: FrameFeed,
    on_stop: Option<Box<dyn FnOnce() + Send>>,
}

impl Playback {
    pub fn new(feed: FrameFeed, on_stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            feed,
            on_stop: Some(Box::new(on_stop)),
        }
    }

    /// Playback over a feed that needs no decoder
    pub fn passthrough(feed: FrameFeed) -> Self {
        Self { feed, on_stop: None }
    }

    pub fn feed(&self) -> FrameFeed {
        self.feed.clone()
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        if let Some(stop) = self.on_stop.take() {
            stop();
        }
    }
}

impl fmt::Debug for Playback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Playback")
            .field("decoding", &self.on_stop.is_some())
            .finish()
    }
}

/// Port that turns a video track into a stream of RGBA frames
#[async_trait]
pub trait FramePlayer: Send + Sync {
    async fn play(&self, track: &MediaTrack) -> Result<Playback, DeviceError>;
}
