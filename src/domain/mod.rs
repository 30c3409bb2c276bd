//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod artifact;
pub mod config;
pub mod error;
pub mod media;
pub mod recording;

// Re-export common types
pub use artifact::{Artifact, Blob, ContainerFormat, ObjectUrl};
pub use config::{AppConfig, CaptureConfig};
pub use error::*;
pub use recording::{Duration, SessionStatus};
