//! Encoding choice, capture parameters and naming of finished recordings.

use std::time::Duration;

/// Target encoder bitrate.
pub const AUDIO_BITS_PER_SECOND: u32 = 128_000;

/// Length of each encoded slice delivered while recording.
pub const TIMESLICE: Duration = Duration::from_secs(10);

/// Container/codec combinations, most preferred first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    WebmOpus,
    OggOpus,
    Mp4Aac,
    Webm,
}

impl AudioFormat {
    pub const PREFERENCE: [AudioFormat; 4] = [
        AudioFormat::WebmOpus,
        AudioFormat::OggOpus,
        AudioFormat::Mp4Aac,
        AudioFormat::Webm,
    ];

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::WebmOpus => "audio/webm;codecs=opus",
            AudioFormat::OggOpus => "audio/ogg;codecs=opus",
            AudioFormat::Mp4Aac => "audio/mp4;codecs=aac",
            AudioFormat::Webm => "audio/webm",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::WebmOpus | AudioFormat::Webm => "webm",
            AudioFormat::OggOpus => "ogg",
            AudioFormat::Mp4Aac => "m4a",
        }
    }

    /// First supported format in preference order, `audio/webm` if none is.
    pub fn select(supports: impl Fn(&str) -> bool) -> AudioFormat {
        AudioFormat::PREFERENCE
            .into_iter()
            .find(|format| supports(format.mime_type()))
            .unwrap_or(AudioFormat::Webm)
    }

    /// `recording_<unix-millis>.<ext>`
    pub fn recording_filename(&self, unix_millis: i64) -> String {
        format!("recording_{}.{}", unix_millis, self.extension())
    }
}

/// Fixed microphone parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub channel_count: u16,
    pub sample_rate: u32,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            channel_count: 1,
            sample_rate: 48_000,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// `mm:ss`; minutes keep counting past an hour.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
