//! Bundle of port implementations a session runs against

use std::sync::Arc;

use super::ports::{
    FramePlayer, MediaDevices, MediaRecorderFactory, MetadataProbe, ObjectUrlStore,
    PermissionQuery, RecorderCapability,
};

/// Shared handles to every port the capture core needs.
#[derive(Clone)]
pub struct CaptureServices {
    pub capability: Arc<dyn RecorderCapability>,
    pub permissions: Arc<dyn PermissionQuery>,
    pub devices: Arc<dyn MediaDevices>,
    pub frames: Arc<dyn FramePlayer>,
    pub recorders: Arc<dyn MediaRecorderFactory>,
    pub urls: Arc<dyn ObjectUrlStore>,
    pub probe: Arc<dyn MetadataProbe>,
}
