//! Recording domain module

mod chunks;
mod duration;
mod status;

pub use chunks::ChunkBuffer;
pub use duration::{Duration, DEFAULT_MAX_DURATION_SECS};
pub use status::{InvalidStateTransition, SessionLifecycle, SessionStatus};
