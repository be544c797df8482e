//! Recording session driver.

use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::analyser::{FrequencyAnalyser, FFT_SIZE, FREQUENCY_BIN_COUNT};
use crate::error::{CaptureError, PermissionDeniedReason};
use crate::format::{AudioFormat, CaptureConstraints, AUDIO_BITS_PER_SECOND, TIMESLICE};
use crate::host::{
    AudioHost, AudioInput, EncoderEvent, EncoderSettings, MediaEncoder, PermissionStatus, Playback,
};
use crate::state::RecordingState;

const TICK: Duration = Duration::from_secs(1);

/// How long `stop` waits for the encoder to flush its last slice.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// A finished recording, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub filename: String,
    pub mime_type: String,
    pub data: Bytes,
    pub duration_seconds: u64,
}

impl Recording {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Owns one microphone session.
///
/// Elapsed time only counts while recording: pausing folds the running span
/// into `accumulated` and cancels the tick, resuming starts a new span.
pub struct AudioCaptureEngine {
    host: Arc<dyn AudioHost>,
    constraints: CaptureConstraints,
    state: RecordingState,
    input: Option<Box<dyn AudioInput>>,
    encoder: Option<Box<dyn MediaEncoder>>,
    events: Option<mpsc::UnboundedReceiver<EncoderEvent>>,
    format: Option<AudioFormat>,
    chunks: Vec<Bytes>,
    recording: Option<Recording>,
    playback: Option<Box<dyn Playback>>,
    accumulated: Duration,
    active_since: Option<Instant>,
    tick: Option<JoinHandle<()>>,
    elapsed_tx: Arc<watch::Sender<u64>>,
    analyser: FrequencyAnalyser,
    samples: Vec<f32>,
    last_error: Option<String>,
}

impl AudioCaptureEngine {
    pub fn new(host: Arc<dyn AudioHost>) -> Self {
        Self::with_constraints(host, CaptureConstraints::default())
    }

    pub fn with_constraints(host: Arc<dyn AudioHost>, constraints: CaptureConstraints) -> Self {
        let (elapsed_tx, _) = watch::channel(0);
        Self {
            host,
            constraints,
            state: RecordingState::Idle,
            input: None,
            encoder: None,
            events: None,
            format: None,
            chunks: Vec::new(),
            recording: None,
            playback: None,
            accumulated: Duration::ZERO,
            active_since: None,
            tick: None,
            elapsed_tx: Arc::new(elapsed_tx),
            analyser: FrequencyAnalyser::new(),
            samples: vec![0.0; FFT_SIZE],
            last_error: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Seconds of active recording in the current session.
    pub fn elapsed_seconds(&self) -> u64 {
        let running = self
            .active_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        (self.accumulated + running).as_secs()
    }

    /// Updated once per second while recording, and on every state change.
    pub fn subscribe_elapsed(&self) -> watch::Receiver<u64> {
        self.elapsed_tx.subscribe()
    }

    /// Slices received so far in this session.
    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    pub fn format(&self) -> Option<AudioFormat> {
        self.format
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Last encoder or playback failure, for display.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn transition(
        &mut self,
        operation: &'static str,
        target: RecordingState,
    ) -> Result<(), CaptureError> {
        if !self.state.can_transition_to(&target) {
            return Err(CaptureError::InvalidState {
                operation,
                state: self.state.to_string(),
            });
        }
        tracing::debug!(from = %self.state, to = %target, operation, "Recording state change");
        self.state = target;
        Ok(())
    }

    /// Acquire the microphone.
    ///
    /// A refusal leaves the engine in `permission-denied`; calling this again
    /// retries.
    pub async fn request_permission(&mut self) -> Result<(), CaptureError> {
        if self.input.is_some() && self.state == RecordingState::Idle {
            return Ok(());
        }
        self.transition("request permission", RecordingState::RequestingPermission)?;

        let result = match self.host.permission_status().await {
            PermissionStatus::Denied => {
                Err(CaptureError::PermissionDenied(PermissionDeniedReason::Denied))
            }
            PermissionStatus::Granted | PermissionStatus::Prompt => {
                self.host.open_input(&self.constraints).await
            }
        };

        match result {
            Ok(input) => {
                tracing::info!(device = input.device_label(), "Microphone acquired");
                self.input = Some(input);
                self.transition("request permission", RecordingState::Idle)
            }
            Err(err) => {
                let reason = match &err {
                    CaptureError::PermissionDenied(reason) => *reason,
                    _ => PermissionDeniedReason::Unknown,
                };
                tracing::warn!(reason = %reason, error = %err, "Microphone permission denied");
                self.transition("request permission", RecordingState::PermissionDenied(reason))?;
                Err(CaptureError::PermissionDenied(reason))
            }
        }
    }

    /// Begin a new session. Clears the previous session's slices and clock.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != RecordingState::Idle {
            return Err(CaptureError::InvalidState {
                operation: "start",
                state: self.state.to_string(),
            });
        }
        if self.input.is_none() {
            self.request_permission().await?;
        }
        let Some(input) = self.input.as_deref() else {
            return Err(CaptureError::DeviceUnavailable(
                "no microphone acquired".to_string(),
            ));
        };

        let host = self.host.clone();
        let format = AudioFormat::select(|mime| host.supports_format(mime));
        let settings = EncoderSettings {
            format,
            bits_per_second: AUDIO_BITS_PER_SECOND,
            timeslice: TIMESLICE,
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let encoder = self.host.start_encoder(input, settings, tx).await?;

        self.encoder = Some(encoder);
        self.events = Some(rx);
        self.format = Some(format);
        self.chunks.clear();
        self.recording = None;
        self.last_error = None;
        self.accumulated = Duration::ZERO;
        self.active_since = Some(Instant::now());
        self.analyser.reset();
        self.elapsed_tx.send_replace(0);
        self.spawn_tick();
        self.transition("start", RecordingState::Recording)?;

        tracing::info!(mime_type = format.mime_type(), "Recording started");
        Ok(())
    }

    /// No-op unless recording.
    pub fn pause(&mut self) -> Result<(), CaptureError> {
        if self.state != RecordingState::Recording {
            return Ok(());
        }
        self.drain_events()?;
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.pause()?;
        }
        self.freeze_clock();
        self.transition("pause", RecordingState::Paused)
    }

    /// No-op unless paused.
    pub fn resume(&mut self) -> Result<(), CaptureError> {
        if self.state != RecordingState::Paused {
            return Ok(());
        }
        self.drain_events()?;
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.resume()?;
        }
        self.active_since = Some(Instant::now());
        self.spawn_tick();
        self.transition("resume", RecordingState::Recording)
    }

    /// Flush the encoder, assemble the recording and release the microphone.
    ///
    /// Calling it again once stopped does nothing.
    pub async fn stop(&mut self) -> Result<(), CaptureError> {
        match self.state {
            RecordingState::Stopped | RecordingState::Playing => return Ok(()),
            state if state.is_capturing() => {}
            state => {
                return Err(CaptureError::InvalidState {
                    operation: "stop",
                    state: state.to_string(),
                })
            }
        }

        self.freeze_clock();
        self.drain_events()?;

        if let Some(mut encoder) = self.encoder.take() {
            if let Err(err) = encoder.stop().await {
                self.fail(err.to_string());
                return Err(err);
            }
        }
        self.flush_events().await?;
        self.release_input();

        if self.chunks.is_empty() {
            tracing::info!("Recording stopped without captured audio");
            self.recording = None;
            return self.transition("stop", RecordingState::Stopped);
        }

        let format = self.format.unwrap_or(AudioFormat::Webm);
        let mut data = BytesMut::with_capacity(self.chunks.iter().map(Bytes::len).sum());
        for chunk in &self.chunks {
            data.extend_from_slice(chunk);
        }
        let recording = Recording {
            filename: format.recording_filename(chrono::Utc::now().timestamp_millis()),
            mime_type: format.mime_type().to_string(),
            data: data.freeze(),
            duration_seconds: self.elapsed_seconds(),
        };
        tracing::info!(
            filename = %recording.filename,
            size = recording.size(),
            duration_seconds = recording.duration_seconds,
            chunks = self.chunks.len(),
            "Recording stopped"
        );
        self.recording = Some(recording);
        self.transition("stop", RecordingState::Stopped)
    }

    /// Preview the finished recording.
    pub async fn play(&mut self) -> Result<(), CaptureError> {
        if self.state != RecordingState::Stopped {
            return Err(CaptureError::InvalidState {
                operation: "play",
                state: self.state.to_string(),
            });
        }
        let Some(recording) = self.recording.as_ref() else {
            return Err(CaptureError::Playback("No recording to play".to_string()));
        };
        let playback = self
            .host
            .play(recording.data.clone(), &recording.mime_type)
            .await
            .inspect_err(|err| self.last_error = Some(err.user_message()))?;
        self.playback = Some(playback);
        self.transition("play", RecordingState::Playing)
    }

    pub fn stop_playback(&mut self) -> Result<(), CaptureError> {
        if self.state != RecordingState::Playing {
            return Ok(());
        }
        if let Some(mut playback) = self.playback.take() {
            playback.stop();
        }
        self.transition("stop playback", RecordingState::Stopped)
    }

    /// The host reports the preview reached its end.
    pub fn on_playback_ended(&mut self) -> Result<(), CaptureError> {
        if self.state != RecordingState::Playing {
            return Ok(());
        }
        self.playback = None;
        self.transition("finish playback", RecordingState::Stopped)
    }

    /// Throw the session away and return to idle.
    pub fn discard(&mut self) -> Result<(), CaptureError> {
        match self.state {
            RecordingState::Recording
            | RecordingState::Paused
            | RecordingState::Stopped
            | RecordingState::Playing => {}
            _ => return Ok(()),
        }
        self.teardown();
        self.reset_session();
        tracing::debug!("Recording discarded");
        self.transition("discard", RecordingState::Idle)
    }

    /// Frequency histogram of the live signal, `None` when not capturing.
    pub fn frequency_data(&mut self) -> Option<[u8; FREQUENCY_BIN_COUNT]> {
        if !self.state.is_capturing() {
            return None;
        }
        let input = self.input.as_mut()?;
        match input.read_samples(&mut self.samples) {
            Ok(n) => Some(self.analyser.frequency_data(&self.samples[..n])),
            Err(err) => {
                tracing::warn!(error = %err, "Visualization unavailable");
                None
            }
        }
    }

    /// Pull delivered slices off the encoder channel.
    ///
    /// An encoder error ends the session and returns the engine to idle.
    pub fn drain_events(&mut self) -> Result<(), CaptureError> {
        let mut failure = None;
        if let Some(events) = self.events.as_mut() {
            while let Ok(event) = events.try_recv() {
                match event {
                    EncoderEvent::Data(chunk) => push_chunk(&mut self.chunks, chunk),
                    EncoderEvent::Error(message) => {
                        failure = Some(message);
                        break;
                    }
                }
            }
        }
        match failure {
            Some(message) => {
                self.fail(message.clone());
                Err(CaptureError::Encoder(message))
            }
            None => Ok(()),
        }
    }

    async fn flush_events(&mut self) -> Result<(), CaptureError> {
        let Some(mut events) = self.events.take() else {
            return Ok(());
        };
        loop {
            match tokio::time::timeout(FLUSH_TIMEOUT, events.recv()).await {
                Ok(Some(EncoderEvent::Data(chunk))) => push_chunk(&mut self.chunks, chunk),
                Ok(Some(EncoderEvent::Error(message))) => {
                    self.fail(message.clone());
                    return Err(CaptureError::Encoder(message));
                }
                Ok(None) => return Ok(()),
                Err(_) => {
                    tracing::warn!("Encoder did not close after stop; keeping slices received so far");
                    return Ok(());
                }
            }
        }
    }

    fn fail(&mut self, message: String) {
        tracing::error!(error = %message, state = %self.state, "Recording failed");
        self.teardown();
        self.reset_session();
        self.last_error = Some(message);
        if self.state.can_transition_to(&RecordingState::Idle) {
            self.state = RecordingState::Idle;
        }
    }

    fn freeze_clock(&mut self) {
        if let Some(since) = self.active_since.take() {
            self.accumulated += since.elapsed();
        }
        self.cancel_tick();
        self.elapsed_tx.send_replace(self.accumulated.as_secs());
    }

    fn spawn_tick(&mut self) {
        self.cancel_tick();
        let Some(since) = self.active_since else {
            return;
        };
        let base = self.accumulated;
        let elapsed_tx = self.elapsed_tx.clone();
        self.tick = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(since + TICK, TICK);
            loop {
                interval.tick().await;
                elapsed_tx.send_replace((base + since.elapsed()).as_secs());
            }
        }));
    }

    fn cancel_tick(&mut self) {
        if let Some(tick) = self.tick.take() {
            tick.abort();
        }
    }

    fn release_input(&mut self) {
        if let Some(mut input) = self.input.take() {
            input.release();
            tracing::debug!("Microphone released");
        }
    }

    fn reset_session(&mut self) {
        self.chunks.clear();
        self.recording = None;
        self.format = None;
        self.accumulated = Duration::ZERO;
        self.active_since = None;
        self.analyser.reset();
        self.elapsed_tx.send_replace(0);
    }

    /// Release every device handle and cancel the tick.
    fn teardown(&mut self) {
        self.cancel_tick();
        self.encoder = None;
        self.events = None;
        if let Some(mut playback) = self.playback.take() {
            playback.stop();
        }
        self.release_input();
    }
}

fn push_chunk(chunks: &mut Vec<Bytes>, chunk: Bytes) {
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
}

impl Drop for AudioCaptureEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAudioHost;
    use std::f32::consts::PI;
    use tokio::time::sleep;

    fn engine() -> (MockAudioHost, AudioCaptureEngine) {
        let host = MockAudioHost::new();
        let engine = AudioCaptureEngine::new(Arc::new(host.clone()));
        (host, engine)
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_counts_only_active_time() {
        let (host, mut engine) = engine();

        engine.start().await.unwrap();
        assert_eq!(engine.state(), RecordingState::Recording);
        sleep(Duration::from_secs(3)).await;

        engine.pause().unwrap();
        assert!(host.encoder_paused());
        sleep(Duration::from_secs(5)).await;
        assert_eq!(engine.elapsed_seconds(), 3);

        engine.resume().unwrap();
        sleep(Duration::from_secs(2)).await;
        host.push_chunk(&b"audio"[..]);
        engine.stop().await.unwrap();

        assert_eq!(engine.elapsed_seconds(), 5);
        assert_eq!(engine.recording().unwrap().duration_seconds, 5);
        assert_eq!(*engine.subscribe_elapsed().borrow(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_publishes_elapsed() {
        let (_host, mut engine) = engine();
        let rx = engine.subscribe_elapsed();

        engine.start().await.unwrap();
        sleep(Duration::from_millis(2500)).await;
        assert_eq!(*rx.borrow(), 2);

        engine.pause().unwrap();
        sleep(Duration::from_secs(10)).await;
        assert_eq!(*rx.borrow(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_concatenates_chunks_and_releases_microphone() {
        let (host, mut engine) = engine();

        engine.start().await.unwrap();
        assert!(host.push_chunk(&b"abc"[..]));
        engine.pause().unwrap();
        assert!(host.push_chunk(&b"def"[..]));
        engine.resume().unwrap();
        host.set_pending_tail(&b"gh"[..]);

        engine.stop().await.unwrap();
        let recording = engine.recording().unwrap();
        assert_eq!(&recording.data[..], b"abcdefgh");
        assert_eq!(recording.mime_type, "audio/webm;codecs=opus");
        assert!(recording.filename.starts_with("recording_"));
        assert!(recording.filename.ends_with(".webm"));

        assert!(!engine.has_input());
        assert_eq!(host.inputs_opened(), 1);
        assert_eq!(host.inputs_released(), 1);
        assert!(!host.encoder_running());

        // Second stop is a no-op.
        engine.stop().await.unwrap();
        assert_eq!(engine.state(), RecordingState::Stopped);
        assert_eq!(host.inputs_released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_then_restart_starts_clean() {
        let (host, mut engine) = engine();

        engine.start().await.unwrap();
        host.push_chunk(&b"first take"[..]);
        sleep(Duration::from_secs(4)).await;
        engine.stop().await.unwrap();
        assert!(engine.recording().is_some());

        engine.discard().unwrap();
        assert_eq!(engine.state(), RecordingState::Idle);
        assert!(engine.recording().is_none());
        assert!(engine.chunks().is_empty());
        assert_eq!(engine.elapsed_seconds(), 0);

        engine.start().await.unwrap();
        engine.drain_events().unwrap();
        assert!(engine.chunks().is_empty());
        assert_eq!(engine.elapsed_seconds(), 0);
        assert_eq!(host.inputs_opened(), 2);
    }

    #[tokio::test]
    async fn test_permission_denied_then_retry() {
        let (host, mut engine) = engine();
        host.refuse_input(Some(PermissionDeniedReason::DeviceBusy));

        let err = engine.start().await.unwrap_err();
        assert!(matches!(
            err,
            CaptureError::PermissionDenied(PermissionDeniedReason::DeviceBusy)
        ));
        assert_eq!(
            engine.state(),
            RecordingState::PermissionDenied(PermissionDeniedReason::DeviceBusy)
        );

        host.refuse_input(None);
        engine.request_permission().await.unwrap();
        assert_eq!(engine.state(), RecordingState::Idle);
        assert!(engine.has_input());
    }

    #[tokio::test]
    async fn test_denied_status_skips_prompt() {
        let (host, mut engine) = engine();
        host.set_permission_status(PermissionStatus::Denied);

        assert!(engine.request_permission().await.is_err());
        assert_eq!(
            engine.state(),
            RecordingState::PermissionDenied(PermissionDeniedReason::Denied)
        );
        assert_eq!(host.inputs_opened(), 0);
    }

    #[tokio::test]
    async fn test_selects_supported_format() {
        let (host, mut engine) = engine();
        host.set_supported_formats(&["audio/mp4;codecs=aac", "audio/webm"]);

        engine.start().await.unwrap();
        assert_eq!(engine.format(), Some(AudioFormat::Mp4Aac));
        let settings = host.encoder_settings().unwrap();
        assert_eq!(settings.bits_per_second, 128_000);
        assert_eq!(settings.timeslice, Duration::from_secs(10));

        host.push_chunk(&b"aac"[..]);
        engine.stop().await.unwrap();
        assert!(engine.recording().unwrap().filename.ends_with(".m4a"));
    }

    #[tokio::test]
    async fn test_stop_without_chunks_has_no_recording() {
        let (host, mut engine) = engine();

        engine.start().await.unwrap();
        engine.stop().await.unwrap();

        assert_eq!(engine.state(), RecordingState::Stopped);
        assert!(engine.recording().is_none());
        assert_eq!(host.inputs_released(), 1);
        assert!(matches!(
            engine.play().await,
            Err(CaptureError::Playback(_))
        ));
    }

    #[tokio::test]
    async fn test_pause_and_resume_are_noops_outside_their_state() {
        let (_host, mut engine) = engine();

        engine.pause().unwrap();
        engine.resume().unwrap();
        assert_eq!(engine.state(), RecordingState::Idle);

        engine.start().await.unwrap();
        engine.resume().unwrap();
        assert_eq!(engine.state(), RecordingState::Recording);
        assert!(engine.start().await.is_err());
    }

    #[tokio::test]
    async fn test_encoder_error_returns_to_idle() {
        let (host, mut engine) = engine();

        engine.start().await.unwrap();
        host.push_chunk(&b"partial"[..]);
        host.fail_encoder("device lost");

        let err = engine.pause().unwrap_err();
        assert!(matches!(err, CaptureError::Encoder(_)));
        assert_eq!(engine.state(), RecordingState::Idle);
        assert_eq!(engine.last_error(), Some("device lost"));
        assert!(engine.chunks().is_empty());
        assert_eq!(host.inputs_released(), 1);
    }

    #[tokio::test]
    async fn test_playback_cycle() {
        let (host, mut engine) = engine();

        engine.start().await.unwrap();
        host.push_chunk(&b"voice"[..]);
        engine.stop().await.unwrap();

        engine.play().await.unwrap();
        assert_eq!(engine.state(), RecordingState::Playing);
        engine.stop_playback().unwrap();
        assert_eq!(engine.state(), RecordingState::Stopped);
        assert_eq!(host.playbacks_stopped(), 1);

        engine.play().await.unwrap();
        engine.on_playback_ended().unwrap();
        assert_eq!(engine.state(), RecordingState::Stopped);
        assert_eq!(host.playbacks_started(), 2);
        assert!(engine.recording().is_some());
    }

    #[tokio::test]
    async fn test_frequency_data_only_while_capturing() {
        let (host, mut engine) = engine();
        host.set_samples(
            (0..FFT_SIZE)
                .map(|n| (2.0 * PI * 16.0 * n as f32 / FFT_SIZE as f32).sin())
                .collect(),
        );
        assert!(engine.frequency_data().is_none());

        engine.start().await.unwrap();
        let data = engine.frequency_data().unwrap();
        assert!(data[16] > 0);

        engine.stop().await.unwrap();
        assert!(engine.frequency_data().is_none());
    }

    #[tokio::test]
    async fn test_drop_releases_microphone() {
        let host = MockAudioHost::new();
        {
            let mut engine = AudioCaptureEngine::new(Arc::new(host.clone()));
            engine.start().await.unwrap();
        }
        assert_eq!(host.inputs_released(), 1);
        assert!(!host.encoder_running());
    }
}
