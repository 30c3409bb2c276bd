//! Media recorder port interfaces

use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::artifact::ContainerFormat;
use crate::domain::error::CaptureError;
use crate::domain::media::MediaStream;

/// Recorder errors
#[derive(Debug, Clone, Error)]
pub enum RecorderError {
    #[error("Unsupported stream: {0}")]
    Unsupported(String),

    #[error("Failed to start recorder: {0}")]
    StartFailed(String),

    #[error("Recorder failed: {0}")]
    Failed(String),

    #[error("Recorder cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: RecorderState,
    },
}

impl From<RecorderError> for CaptureError {
    fn from(err: RecorderError) -> Self {
        Self::RecorderFailed(err.to_string())
    }
}

/// Recorder lifecycle as seen by its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Inactive,
    Recording,
    Stopping,
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Inactive => "inactive",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Events a recorder emits while it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// One encoded fragment, in output order
    DataAvailable(Vec<u8>),
    /// Non-fatal or fatal failure; a `Stopped` event always follows a fatal one
    Error(String),
    /// All data has been delivered
    Stopped,
}

/// Envelope carrying the generation of the recording that produced the event
pub type TaggedEvent = (u64, RecorderEvent);

/// Where a recorder delivers its events. Cloneable so encoder tasks can share it.
#[derive(Debug, Clone)]
pub struct RecorderEventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl RecorderEventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the owning session is gone.
    pub fn send(&self, event: RecorderEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }

    pub fn data(&self, bytes: Vec<u8>) -> bool {
        self.send(RecorderEvent::DataAvailable(bytes))
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.send(RecorderEvent::Error(message.into()))
    }

    pub fn stopped(&self) -> bool {
        self.send(RecorderEvent::Stopped)
    }
}

/// Port for one encoder instance bound to one stream.
///
/// `stop` only requests a flush. Completion arrives later as
/// `RecorderEvent::Stopped` on the sink.
pub trait MediaRecorder: Send {
    fn start(&mut self) -> Result<(), RecorderError>;

    fn stop(&mut self) -> Result<(), RecorderError>;

    fn state(&self) -> RecorderState;
}

/// Port for creating recorders
pub trait MediaRecorderFactory: Send + Sync {
    fn create(
        &self,
        stream: &MediaStream,
        format: ContainerFormat,
        sink: RecorderEventSink,
    ) -> Result<Box<dyn MediaRecorder>, RecorderError>;
}
