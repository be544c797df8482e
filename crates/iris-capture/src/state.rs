//! Recording state machine.
//!
//! Valid transitions:
//! - Idle -> RequestingPermission -> Idle | PermissionDenied
//! - PermissionDenied -> RequestingPermission (explicit retry)
//! - Idle -> Recording (start)
//! - Recording <-> Paused
//! - Recording | Paused -> Stopped (stop)
//! - Recording | Paused -> Idle (encoder failure)
//! - Stopped -> Playing -> Stopped (preview)
//! - Stopped | Playing -> Idle (discard)

use std::fmt;

use crate::error::PermissionDeniedReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordingState {
    Idle,
    RequestingPermission,
    PermissionDenied(PermissionDeniedReason),
    Recording,
    Paused,
    Stopped,
    Playing,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingState::Idle => write!(f, "idle"),
            RecordingState::RequestingPermission => write!(f, "requesting-permission"),
            RecordingState::PermissionDenied(reason) => write!(f, "permission-denied({})", reason),
            RecordingState::Recording => write!(f, "recording"),
            RecordingState::Paused => write!(f, "paused"),
            RecordingState::Stopped => write!(f, "stopped"),
            RecordingState::Playing => write!(f, "playing"),
        }
    }
}

impl RecordingState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &RecordingState) -> bool {
        use RecordingState::*;
        matches!(
            (self, target),
            (Idle, RequestingPermission)
                | (PermissionDenied(_), RequestingPermission)
                | (RequestingPermission, Idle)
                | (RequestingPermission, PermissionDenied(_))
                | (Idle, Recording)
                | (Recording, Paused)
                | (Paused, Recording)
                | (Recording, Stopped)
                | (Paused, Stopped)
                | (Recording, Idle)
                | (Paused, Idle)
                | (Stopped, Playing)
                | (Playing, Stopped)
                | (Stopped, Idle)
                | (Playing, Idle)
        )
    }

    /// Whether the microphone signal is live (visualization runs).
    pub fn is_capturing(&self) -> bool {
        matches!(self, RecordingState::Recording | RecordingState::Paused)
    }
}
