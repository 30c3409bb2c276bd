//! Recording capability port

use crate::domain::artifact::ContainerFormat;

/// Port describing what the recording runtime can do.
///
/// Queried synchronously before any device is opened, so implementations
/// should cache anything expensive.
pub trait RecorderCapability: Send + Sync {
    /// Whether a recording facility exists at all
    fn is_available(&self) -> bool;

    /// Whether the runtime can encode the given container/codec combination
    fn is_type_supported(&self, format: ContainerFormat) -> bool;

    /// Human-readable name used in diagnostics
    fn runtime_name(&self) -> String;
}
