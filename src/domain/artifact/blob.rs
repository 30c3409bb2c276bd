//! Finished recordings and their access URLs

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Container the recorder muxes into. Each format has one fixed MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContainerFormat {
    #[default]
    Webm,
    Mp4,
}

impl ContainerFormat {
    pub const ALL: [ContainerFormat; 2] = [Self::Webm, Self::Mp4];

    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Webm => "video/webm",
            Self::Mp4 => "video/mp4",
        }
    }

    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
        }
    }

    /// Fixed name offered for download
    pub const fn download_filename(&self) -> &'static str {
        match self {
            Self::Webm => "recording.webm",
            Self::Mp4 => "recording.mp4",
        }
    }

    pub fn valid_names() -> &'static str {
        "webm, mp4"
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ContainerFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webm" | "video/webm" => Ok(Self::Webm),
            "mp4" | "video/mp4" => Ok(Self::Mp4),
            other => Err(format!(
                "unknown format '{}'. Valid options: {}",
                other,
                Self::valid_names()
            )),
        }
    }
}

/// Immutable binary object tagged with its container format.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Arc<[u8]>,
    format: ContainerFormat,
}

impl Blob {
    pub fn new(bytes: Vec<u8>, format: ContainerFormat) -> Self {
        Self {
            bytes: Arc::from(bytes),
            format,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .finish()
    }
}

/// Dereferenceable handle to a blob, valid until revoked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A finished recording plus the URL it can be played back from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub blob: Blob,
    pub url: ObjectUrl,
}

impl Artifact {
    pub fn new(blob: Blob, url: ObjectUrl) -> Self {
        Self { blob, url }
    }

    pub fn download_filename(&self) -> &'static str {
        self.blob.format().download_filename()
    }

    pub fn size(&self) -> usize {
        self.blob.len()
    }
}

/// Holds at most one live artifact. Every replacement or release hands the
/// previous URL to `revoke` before the slot changes.
#[derive(Debug, Default)]
pub struct ArtifactSlot {
    current: Option<Artifact>,
}

impl ArtifactSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Artifact> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Install `next`, revoking the previous URL first.
    pub fn replace_with(&mut self, next: Artifact, revoke: impl FnOnce(&ObjectUrl)) {
        if let Some(prev) = self.current.take() {
            revoke(&prev.url);
        }
        self.current = Some(next);
    }

    /// Revoke and clear. Returns whether anything was held.
    pub fn release_with(&mut self, revoke: impl FnOnce(&ObjectUrl)) -> bool {
        match self.current.take() {
            Some(prev) => {
                revoke(&prev.url);
                true
            }
            None => false,
        }
    }
}
