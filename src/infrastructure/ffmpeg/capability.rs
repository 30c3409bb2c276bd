//! Recording capability from the local FFmpeg build

use std::collections::HashSet;
use std::process::Stdio;

use tokio::process::Command;

use crate::application::ports::RecorderCapability;
use crate::domain::artifact::ContainerFormat;

use super::FFMPEG_BINARY;

/// Muxer and encoders a container needs
fn requirements(format: ContainerFormat) -> (&'static str, &'static [&'static str]) {
    match format {
        ContainerFormat::Webm => ("webm", &["libvpx", "libopus"]),
        ContainerFormat::Mp4 => ("mp4", &["libx264", "aac"]),
    }
}

/// Names from `ffmpeg -muxers` / `ffmpeg -encoders` listings. Entry lines are
/// a flags column followed by a (possibly comma-separated) name column.
fn listed_names(listing: &str) -> HashSet<String> {
    listing
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let flags = columns.next()?;
            let names = columns.next()?;
            flags
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == '.')
                .then_some(names)
        })
        .flat_map(|names| names.split(','))
        .map(str::to_string)
        .collect()
}

/// Capability snapshot of one FFmpeg installation, detected once.
#[derive(Debug, Clone, Default)]
pub struct FfmpegCapability {
    binary: String,
    available: bool,
    muxers: HashSet<String>,
    encoders: HashSet<String>,
}

impl FfmpegCapability {
    /// Probe the `ffmpeg` on `PATH`
    pub async fn detect() -> Self {
        Self::detect_binary(FFMPEG_BINARY).await
    }

    pub async fn detect_binary(binary: &str) -> Self {
        let muxers = Self::list(binary, "-muxers").await;
        let encoders = Self::list(binary, "-encoders").await;
        match (muxers, encoders) {
            (Some(muxers), Some(encoders)) => Self::from_listings(binary, &muxers, &encoders),
            _ => {
                tracing::debug!(binary, "ffmpeg not usable");
                Self {
                    binary: binary.to_string(),
                    ..Self::default()
                }
            }
        }
    }

    /// Build from captured listings
    pub fn from_listings(binary: &str, muxers: &str, encoders: &str) -> Self {
        let capability = Self {
            binary: binary.to_string(),
            available: true,
            muxers: listed_names(muxers),
            encoders: listed_names(encoders),
        };
        tracing::debug!(
            binary,
            muxers = capability.muxers.len(),
            encoders = capability.encoders.len(),
            "ffmpeg capability detected"
        );
        capability
    }

    async fn list(binary: &str, flag: &str) -> Option<String> {
        let output = Command::new(binary)
            .args(["-hide_banner", flag])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// What is missing for `format`, if anything
    pub fn missing(&self, format: ContainerFormat) -> Vec<&'static str> {
        let (muxer, encoders) = requirements(format);
        std::iter::once(muxer)
            .filter(|m| !self.muxers.contains(*m))
            .chain(encoders.iter().copied().filter(|e| !self.encoders.contains(*e)))
            .collect()
    }
}

impl RecorderCapability for FfmpegCapability {
    fn is_available(&self) -> bool {
        self.available
    }

    fn is_type_supported(&self, format: ContainerFormat) -> bool {
        self.available && self.missing(format).is_empty()
    }

    fn runtime_name(&self) -> String {
        if self.binary.is_empty() {
            FFMPEG_BINARY.to_string()
        } else {
            self.binary.clone()
        }
    }
}
