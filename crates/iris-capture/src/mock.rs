//! In-process host for tests and headless runs.
//!
//! Clones share state, so a test keeps one handle while the engine owns
//! another and can push encoded slices or inspect device usage.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use crate::error::{CaptureError, PermissionDeniedReason};
use crate::format::CaptureConstraints;
use crate::host::{
    AudioHost, AudioInput, EncoderEvent, EncoderSettings, MediaEncoder, PermissionStatus, Playback,
};

#[derive(Default)]
struct MockState {
    status: Option<PermissionStatus>,
    refuse_with: Option<PermissionDeniedReason>,
    supported: Option<Vec<String>>,
    samples: Vec<f32>,
    inputs_opened: usize,
    inputs_released: usize,
    encoder_tx: Option<mpsc::UnboundedSender<EncoderEvent>>,
    encoder_settings: Option<EncoderSettings>,
    encoder_paused: bool,
    pending_tail: Option<Bytes>,
    playbacks_started: usize,
    playbacks_stopped: usize,
}

#[derive(Clone, Default)]
pub struct MockAudioHost {
    state: Arc<Mutex<MockState>>,
}

impl MockAudioHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_permission_status(&self, status: PermissionStatus) {
        self.lock().status = Some(status);
    }

    /// Make the next `open_input` calls fail with `reason`; `None` grants again.
    pub fn refuse_input(&self, reason: Option<PermissionDeniedReason>) {
        self.lock().refuse_with = reason;
    }

    /// Restrict the encodings reported as supported.
    pub fn set_supported_formats(&self, mime_types: &[&str]) {
        self.lock().supported = Some(mime_types.iter().map(|m| m.to_string()).collect());
    }

    /// Samples returned by every input read.
    pub fn set_samples(&self, samples: Vec<f32>) {
        self.lock().samples = samples;
    }

    /// Deliver an encoded slice from the running encoder.
    pub fn push_chunk(&self, data: impl Into<Bytes>) -> bool {
        match &self.lock().encoder_tx {
            Some(tx) => tx.send(EncoderEvent::Data(data.into())).is_ok(),
            None => false,
        }
    }

    pub fn fail_encoder(&self, message: &str) -> bool {
        match &self.lock().encoder_tx {
            Some(tx) => tx.send(EncoderEvent::Error(message.to_string())).is_ok(),
            None => false,
        }
    }

    /// Bytes the encoder still holds and flushes when stopped.
    pub fn set_pending_tail(&self, data: impl Into<Bytes>) {
        self.lock().pending_tail = Some(data.into());
    }

    pub fn inputs_opened(&self) -> usize {
        self.lock().inputs_opened
    }

    pub fn inputs_released(&self) -> usize {
        self.lock().inputs_released
    }

    pub fn encoder_running(&self) -> bool {
        self.lock().encoder_tx.is_some()
    }

    pub fn encoder_paused(&self) -> bool {
        self.lock().encoder_paused
    }

    pub fn encoder_settings(&self) -> Option<EncoderSettings> {
        self.lock().encoder_settings
    }

    pub fn playbacks_started(&self) -> usize {
        self.lock().playbacks_started
    }

    pub fn playbacks_stopped(&self) -> usize {
        self.lock().playbacks_stopped
    }
}

#[async_trait]
impl AudioHost for MockAudioHost {
    async fn permission_status(&self) -> PermissionStatus {
        let state = self.lock();
        match (state.status, state.refuse_with) {
            (Some(status), _) => status,
            (None, Some(_)) => PermissionStatus::Prompt,
            (None, None) => PermissionStatus::Granted,
        }
    }

    async fn open_input(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn AudioInput>, CaptureError> {
        let mut state = self.lock();
        if let Some(reason) = state.refuse_with {
            return Err(CaptureError::PermissionDenied(reason));
        }
        state.inputs_opened += 1;
        Ok(Box::new(MockInput {
            host: self.clone(),
            label: format!("mock microphone ({} Hz)", constraints.sample_rate),
            released: false,
        }))
    }

    fn supports_format(&self, mime_type: &str) -> bool {
        match &self.lock().supported {
            Some(list) => list.iter().any(|m| m == mime_type),
            None => true,
        }
    }

    async fn start_encoder(
        &self,
        _input: &dyn AudioInput,
        settings: EncoderSettings,
        events: mpsc::UnboundedSender<EncoderEvent>,
    ) -> Result<Box<dyn MediaEncoder>, CaptureError> {
        let mut state = self.lock();
        state.encoder_tx = Some(events);
        state.encoder_settings = Some(settings);
        state.encoder_paused = false;
        Ok(Box::new(MockEncoder { host: self.clone() }))
    }

    async fn play(&self, data: Bytes, _mime_type: &str) -> Result<Box<dyn Playback>, CaptureError> {
        if data.is_empty() {
            return Err(CaptureError::Playback("Nothing to play".to_string()));
        }
        self.lock().playbacks_started += 1;
        Ok(Box::new(MockPlayback {
            host: self.clone(),
            stopped: false,
        }))
    }
}

struct MockInput {
    host: MockAudioHost,
    label: String,
    released: bool,
}

impl AudioInput for MockInput {
    fn device_label(&self) -> &str {
        &self.label
    }

    fn read_samples(&mut self, out: &mut [f32]) -> Result<usize, CaptureError> {
        if self.released {
            return Err(CaptureError::DeviceUnavailable("input released".to_string()));
        }
        let state = self.host.lock();
        let n = out.len().min(state.samples.len());
        out[..n].copy_from_slice(&state.samples[..n]);
        Ok(n)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.host.lock().inputs_released += 1;
        }
    }
}

struct MockEncoder {
    host: MockAudioHost,
}

#[async_trait]
impl MediaEncoder for MockEncoder {
    fn pause(&mut self) -> Result<(), CaptureError> {
        self.host.lock().encoder_paused = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), CaptureError> {
        self.host.lock().encoder_paused = false;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        let mut guard = self.host.lock();
        let state = &mut *guard;
        if let (Some(tx), Some(tail)) = (state.encoder_tx.as_ref(), state.pending_tail.take()) {
            // The receiver may already be gone after a teardown.
            let _ = tx.send(EncoderEvent::Data(tail));
        }
        state.encoder_tx = None;
        Ok(())
    }
}

impl Drop for MockEncoder {
    fn drop(&mut self) {
        self.host.lock().encoder_tx = None;
    }
}

struct MockPlayback {
    host: MockAudioHost,
    stopped: bool,
}

impl Playback for MockPlayback {
    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.host.lock().playbacks_stopped += 1;
        }
    }
}
