//! Acquisition constraints

/// Requested video properties; the device reports what it actually delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frame_rate: 30,
        }
    }
}

/// What to request from the device layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: Option<VideoConstraints>,
}

impl MediaConstraints {
    pub fn audio_video(video: VideoConstraints) -> Self {
        Self {
            audio: true,
            video: Some(video),
        }
    }

    pub fn video_only(video: VideoConstraints) -> Self {
        Self {
            audio: false,
            video: Some(video),
        }
    }

    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: None,
        }
    }

    pub fn wants_video(&self) -> bool {
        self.video.is_some()
    }
}
