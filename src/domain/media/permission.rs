//! Device permission snapshot

use std::fmt;

/// Capture devices that need user authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Microphone,
    Camera,
}

impl DeviceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Microphone => "microphone",
            Self::Camera => "camera",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authorization state reported by the runtime. `Unknown` covers runtimes
/// without a permission query facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PermissionState {
    Granted,
    Denied,
    #[default]
    Unknown,
}

impl PermissionState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only snapshot of microphone and camera authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionReport {
    pub microphone: PermissionState,
    pub camera: PermissionState,
}

impl PermissionReport {
    /// Combined verdict: denied if either device is denied, granted only if both are.
    pub fn overall(&self) -> PermissionState {
        match (self.microphone, self.camera) {
            (PermissionState::Denied, _) | (_, PermissionState::Denied) => PermissionState::Denied,
            (PermissionState::Granted, PermissionState::Granted) => PermissionState::Granted,
            _ => PermissionState::Unknown,
        }
    }

    /// First device that is explicitly denied, microphone first.
    pub fn denied_device(&self) -> Option<DeviceKind> {
        if self.microphone == PermissionState::Denied {
            Some(DeviceKind::Microphone)
        } else if self.camera == PermissionState::Denied {
            Some(DeviceKind::Camera)
        } else {
            None
        }
    }
}
