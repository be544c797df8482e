//! Platform audio seams.
//!
//! A host hands out the microphone, the encoder and the preview player. The
//! engine never touches a device directly.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::CaptureError;
use crate::format::{AudioFormat, CaptureConstraints};

/// Microphone permission as last reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    /// Not decided yet; opening an input will prompt.
    Prompt,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub format: AudioFormat,
    pub bits_per_second: u32,
    pub timeslice: Duration,
}

/// Delivered by a running encoder on its event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// One encoded slice, in capture order.
    Data(Bytes),
    Error(String),
}

/// An acquired capture device.
pub trait AudioInput: Send + Sync {
    fn device_label(&self) -> &str;

    /// Copy the most recent time-domain samples into `out`, returning how many
    /// were written.
    fn read_samples(&mut self, out: &mut [f32]) -> Result<usize, CaptureError>;

    /// Release the hardware. Safe to call more than once.
    fn release(&mut self);
}

#[async_trait]
pub trait MediaEncoder: Send {
    fn pause(&mut self) -> Result<(), CaptureError>;

    fn resume(&mut self) -> Result<(), CaptureError>;

    /// Emit whatever is still buffered as a final `Data` event, then close the
    /// event channel.
    async fn stop(&mut self) -> Result<(), CaptureError>;
}

pub trait Playback: Send {
    fn stop(&mut self);
}

#[async_trait]
pub trait AudioHost: Send + Sync {
    async fn permission_status(&self) -> PermissionStatus;

    /// Acquire the microphone. Refusals come back as
    /// [`CaptureError::PermissionDenied`].
    async fn open_input(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn AudioInput>, CaptureError>;

    fn supports_format(&self, mime_type: &str) -> bool;

    async fn start_encoder(
        &self,
        input: &dyn AudioInput,
        settings: EncoderSettings,
        events: mpsc::UnboundedSender<EncoderEvent>,
    ) -> Result<Box<dyn MediaEncoder>, CaptureError>;

    async fn play(&self, data: Bytes, mime_type: &str) -> Result<Box<dyn Playback>, CaptureError>;
}
