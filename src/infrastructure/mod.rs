//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with external systems like FFmpeg, V4L2 and the filesystem.

pub mod config;
pub mod devices;
pub mod ffmpeg;
pub mod permissions;
pub mod sink;
pub mod urls;

// Re-export adapters
pub use config::XdgConfigStore;
pub use devices::LinuxMediaDevices;
pub use ffmpeg::{FfmpegCapability, FfmpegFramePlayer, FfmpegRecorderFactory, FfprobeProbe};
pub use permissions::DeviceNodePermissions;
pub use sink::DirectorySink;
pub use urls::{MemoryUrlStore, SpoolUrlStore};
