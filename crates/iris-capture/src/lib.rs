//! Iris Capture - microphone recording for story files.
//!
//! [`AudioCaptureEngine`] drives one recording session through an explicit
//! state machine: permission, record, pause/resume, stop, preview and discard.
//! Platform audio is reached through the [`AudioHost`] trait so the engine runs
//! unchanged against a browser bridge, a native backend or [`mock::MockAudioHost`].

pub mod analyser;
pub mod engine;
pub mod error;
pub mod format;
pub mod host;
pub mod mock;
pub mod state;

pub use analyser::{FrequencyAnalyser, FFT_SIZE, FREQUENCY_BIN_COUNT};
pub use engine::{AudioCaptureEngine, Recording};
pub use error::{CaptureError, PermissionDeniedReason};
pub use format::{format_elapsed, AudioFormat, CaptureConstraints};
pub use host::{
    AudioHost, AudioInput, EncoderEvent, EncoderSettings, MediaEncoder, PermissionStatus, Playback,
};
pub use state::RecordingState;
