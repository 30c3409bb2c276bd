//! Capability check and permission gate

use crate::domain::artifact::ContainerFormat;
use crate::domain::error::CaptureError;
use crate::domain::media::{DeviceKind, PermissionReport, PermissionState};

use super::ports::{PermissionQuery, PermissionQueryError, RecorderCapability};

/// Verify the runtime can record `format`. Synchronous; runs before any device is opened.
pub fn check_capability(
    capability: &dyn RecorderCapability,
    format: ContainerFormat,
) -> Result<(), CaptureError> {
    let runtime = capability.runtime_name();

    if !capability.is_available() {
        return Err(CaptureError::UnsupportedRuntime {
            requirement: "video (no media recording facility found)".to_string(),
            suggestion: format!("Install {} or run on a system that provides it", runtime),
        });
    }

    if !capability.is_type_supported(format) {
        let alternative = ContainerFormat::ALL
            .into_iter()
            .find(|&f| f != format && capability.is_type_supported(f));
        let suggestion = match alternative {
            Some(alt) => format!("Choose the {} format instead", alt),
            None => format!("Use a {} build that can encode {}", runtime, format.mime_type()),
        };
        return Err(CaptureError::UnsupportedRuntime {
            requirement: format.mime_type().to_string(),
            suggestion,
        });
    }

    Ok(())
}

async fn query_one(query: &dyn PermissionQuery, device: DeviceKind) -> PermissionState {
    match query.query(device).await {
        Ok(state) => state,
        Err(PermissionQueryError::Unsupported(reason)) => {
            tracing::debug!(%device, %reason, "permission query unavailable");
            PermissionState::Unknown
        }
        Err(PermissionQueryError::Failed(reason)) => {
            tracing::warn!(%device, %reason, "permission query failed");
            PermissionState::Unknown
        }
    }
}

/// Snapshot microphone and camera authorization. Never fails: a missing
/// query facility reads as `Unknown`.
pub async fn check_permissions(query: &dyn PermissionQuery) -> PermissionReport {
    let (microphone, camera) = tokio::join!(
        query_one(query, DeviceKind::Microphone),
        query_one(query, DeviceKind::Camera),
    );
    PermissionReport { microphone, camera }
}

/// Abort start-up if either device is explicitly denied.
pub async fn require_permissions(
    query: &dyn PermissionQuery,
) -> Result<PermissionReport, CaptureError> {
    let report = check_permissions(query).await;
    tracing::debug!(microphone = %report.microphone, camera = %report.camera, "permissions checked");
    match report.denied_device() {
        Some(device) => Err(CaptureError::PermissionDenied { device }),
        None => Ok(report),
    }
}
