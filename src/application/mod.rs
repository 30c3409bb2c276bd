//! Application layer - Use cases and port interfaces
//!
//! Contains the recording session, the capture pipeline it drives, and the
//! trait definitions for external system interactions.

pub mod acquire;
pub mod combiner;
pub mod compositor;
pub mod gate;
pub mod ports;
pub mod services;
pub mod session;
pub mod validator;

// Re-export use cases
pub use acquire::{acquire_sources, CaptureSources};
pub use combiner::combine;
pub use compositor::{Compositor, RenderLoop, Surface};
pub use gate::{check_capability, check_permissions, require_permissions};
pub use services::CaptureServices;
pub use session::{RecordingSession, SessionSnapshot, ViewState};
pub use validator::{ArtifactValidator, VALIDATION_TIMEOUT};
