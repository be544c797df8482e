use std::fmt;
use thiserror::Error;

/// Why the microphone could not be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionDeniedReason {
    /// The user or platform refused access.
    Denied,
    /// No capture device is present.
    NoDevice,
    /// A device exists but another process holds it.
    DeviceBusy,
    Unknown,
}

impl fmt::Display for PermissionDeniedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionDeniedReason::Denied => write!(f, "denied"),
            PermissionDeniedReason::NoDevice => write!(f, "no-device"),
            PermissionDeniedReason::DeviceBusy => write!(f, "device-busy"),
            PermissionDeniedReason::Unknown => write!(f, "unknown"),
        }
    }
}

impl PermissionDeniedReason {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            PermissionDeniedReason::Denied => {
                "Microphone access was denied. Allow microphone access and try again."
            }
            PermissionDeniedReason::NoDevice => "No microphone was found.",
            PermissionDeniedReason::DeviceBusy => {
                "The microphone is in use by another application."
            }
            PermissionDeniedReason::Unknown => "The microphone could not be started.",
        }
    }
}

/// Capture errors. None of them are retried automatically.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Microphone permission denied ({0})")]
    PermissionDenied(PermissionDeniedReason),

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Playback error: {0}")]
    Playback(String),
}

impl CaptureError {
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::PermissionDenied(reason) => reason.user_message().to_string(),
            other => other.to_string(),
        }
    }
}
