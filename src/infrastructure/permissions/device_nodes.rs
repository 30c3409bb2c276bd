//! Device-node permission query
//!
//! Reads authorization from the access bits of the kernel device nodes:
//! `/dev/video*` for cameras and `/dev/snd/pcmC*D*c` for capture PCMs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::application::ports::{PermissionQuery, PermissionQueryError};
use crate::domain::media::{DeviceKind, PermissionState};

/// Permission query over a `/dev`-style directory
pub struct DeviceNodePermissions {
    dev_root: PathBuf,
}

impl DeviceNodePermissions {
    pub fn new() -> Self {
        Self::with_root("/dev")
    }

    /// Query a different device root (containers, tests)
    pub fn with_root(dev_root: impl Into<PathBuf>) -> Self {
        Self {
            dev_root: dev_root.into(),
        }
    }
}

impl Default for DeviceNodePermissions {
    fn default() -> Self {
        Self::new()
    }
}

fn is_video_node(name: &str) -> bool {
    name.starts_with("video")
}

fn is_capture_pcm(name: &str) -> bool {
    name.strip_prefix("pcmC")
        .and_then(|rest| rest.strip_suffix('c'))
        .map(|mid| mid.contains('D'))
        .unwrap_or(false)
}

fn list_nodes(root: &Path, device: DeviceKind) -> Vec<PathBuf> {
    let (dir, matches): (PathBuf, fn(&str) -> bool) = match device {
        DeviceKind::Camera => (root.to_path_buf(), is_video_node),
        DeviceKind::Microphone => (root.join("snd"), is_capture_pcm),
    };
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut nodes: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_str().map(matches).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    nodes.sort();
    nodes
}

#[cfg(unix)]
fn node_state(node: &Path, device: DeviceKind) -> PermissionState {
    use nix::errno::Errno;
    use nix::unistd::{access, AccessFlags};

    let mode = match device {
        DeviceKind::Camera => AccessFlags::R_OK | AccessFlags::W_OK,
        DeviceKind::Microphone => AccessFlags::R_OK,
    };
    match access(node, mode) {
        Ok(()) => PermissionState::Granted,
        Err(Errno::EACCES) | Err(Errno::EPERM) => PermissionState::Denied,
        Err(e) => {
            tracing::debug!(node = %node.display(), error = %e, "device node not accessible");
            PermissionState::Unknown
        }
    }
}

#[cfg(not(unix))]
fn node_state(_node: &Path, _device: DeviceKind) -> PermissionState {
    PermissionState::Unknown
}

fn probe(root: &Path, device: DeviceKind) -> Result<PermissionState, PermissionQueryError> {
    let nodes = list_nodes(root, device);
    if nodes.is_empty() {
        return Err(PermissionQueryError::Unsupported(format!(
            "no {} device nodes under {}",
            device,
            root.display()
        )));
    }

    let mut denied = false;
    for node in &nodes {
        match node_state(node, device) {
            PermissionState::Granted => return Ok(PermissionState::Granted),
            PermissionState::Denied => denied = true,
            PermissionState::Unknown => {}
        }
    }
    Ok(if denied {
        PermissionState::Denied
    } else {
        PermissionState::Unknown
    })
}

#[async_trait]
impl PermissionQuery for DeviceNodePermissions {
    async fn query(&self, device: DeviceKind) -> Result<PermissionState, PermissionQueryError> {
        let root = self.dev_root.clone();
        tokio::task::spawn_blocking(move || probe(&root, device))
            .await
            .map_err(|e| PermissionQueryError::Failed(e.to_string()))?
    }
}
