//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capability;
pub mod config;
pub mod devices;
pub mod frames;
pub mod object_url;
pub mod permissions;
pub mod probe;
pub mod recorder;
pub mod sink;

// Re-export common types
pub use capability::RecorderCapability;
pub use config::ConfigStore;
pub use devices::{DeviceError, MediaDevices};
pub use frames::{FramePlayer, Playback};
pub use object_url::{ObjectUrlStore, UrlError};
pub use permissions::{PermissionQuery, PermissionQueryError};
pub use probe::{MetadataProbe, ProbeError};
pub use recorder::{
    MediaRecorder, MediaRecorderFactory, RecorderError, RecorderEvent, RecorderEventSink,
    RecorderState, TaggedEvent,
};
pub use sink::{ArtifactSink, SinkError, SinkReceipt};
