//! Artifact domain module

mod blob;
mod validation;

pub use blob::{Artifact, ArtifactSlot, Blob, ContainerFormat, ObjectUrl};
pub use validation::{InvalidReason, MediaMetadata, ValidationOutcome};
