//! Media domain module: devices, permissions, streams and frames

mod constraints;
mod frame;
mod permission;
mod stream;

pub use constraints::{MediaConstraints, VideoConstraints};
pub use frame::{frame_channel, FrameFeed, VideoFrame};
pub use permission::{DeviceKind, PermissionReport, PermissionState};
pub use stream::{MediaStream, MediaTrack, ReleaseHook, TrackKind, TrackSettings, TrackSource};
