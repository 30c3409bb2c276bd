//! Recording session status and transition guard

use std::fmt;
use thiserror::Error;

/// Recording session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Initializing,
    Recording,
    Finalizing,
}

impl SessionStatus {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Recording => "recording",
            Self::Finalizing => "finalizing",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid state transition: cannot {action} while {current_state}")]
pub struct InvalidStateTransition {
    pub current_state: SessionStatus,
    pub action: String,
}

/// Transition guard for one session lineage.
///
/// State machine:
///   IDLE -> INITIALIZING (begin_initializing)
///   INITIALIZING -> RECORDING (begin_recording)
///   INITIALIZING -> IDLE (abort)
///   RECORDING -> FINALIZING (begin_finalizing)
///   FINALIZING -> IDLE (finish)
///   any -> IDLE (reset, abrupt teardown)
#[derive(Debug, Default)]
pub struct SessionLifecycle {
    status: SessionStatus,
}

impl SessionLifecycle {
    /// Create a lifecycle in idle state
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
        }
    }

    /// Get the current status
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_idle(&self) -> bool {
        self.status == SessionStatus::Idle
    }

    pub fn is_recording(&self) -> bool {
        self.status == SessionStatus::Recording
    }

    fn transition(
        &mut self,
        from: SessionStatus,
        to: SessionStatus,
        action: &str,
    ) -> Result<(), InvalidStateTransition> {
        if self.status != from {
            return Err(InvalidStateTransition {
                current_state: self.status,
                action: action.to_string(),
            });
        }
        tracing::debug!(from = %from, to = %to, "session transition");
        self.status = to;
        Ok(())
    }

    /// Transition from IDLE to INITIALIZING
    pub fn begin_initializing(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionStatus::Idle, SessionStatus::Initializing, "start")
    }

    /// Transition from INITIALIZING to RECORDING
    pub fn begin_recording(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            SessionStatus::Initializing,
            SessionStatus::Recording,
            "begin recording",
        )
    }

    /// Transition from INITIALIZING back to IDLE after a failed or cancelled start
    pub fn abort(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionStatus::Initializing, SessionStatus::Idle, "abort start-up")
    }

    /// Transition from RECORDING to FINALIZING
    pub fn begin_finalizing(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionStatus::Recording, SessionStatus::Finalizing, "stop")
    }

    /// Transition from FINALIZING to IDLE
    pub fn finish(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionStatus::Finalizing, SessionStatus::Idle, "finish")
    }

    /// Force IDLE regardless of the current state
    pub fn reset(&mut self) {
        self.status = SessionStatus::Idle;
    }
}
