//! Byte-valued frequency histogram for the live recording meter.
//!
//! Mirrors a browser analyser node: Blackman window, magnitude spectrum with
//! temporal smoothing, decibels mapped linearly onto `0..=255`.

use std::f32::consts::PI;

pub const FFT_SIZE: usize = 256;
pub const FREQUENCY_BIN_COUNT: usize = FFT_SIZE / 2;

const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;
const SMOOTHING_TIME_CONSTANT: f32 = 0.8;

pub struct FrequencyAnalyser {
    window: Vec<f32>,
    smoothed: Vec<f32>,
}

impl Default for FrequencyAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrequencyAnalyser {
    pub fn new() -> Self {
        let window = (0..FFT_SIZE)
            .map(|i| {
                let x = i as f32 / FFT_SIZE as f32;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();
        Self {
            window,
            smoothed: vec![0.0; FREQUENCY_BIN_COUNT],
        }
    }

    /// Fold the latest `FFT_SIZE` time-domain samples into the histogram.
    ///
    /// Shorter input is zero-padded; extra samples are ignored.
    pub fn frequency_data(&mut self, samples: &[f32]) -> [u8; FREQUENCY_BIN_COUNT] {
        let windowed: Vec<f32> = (0..FFT_SIZE)
            .map(|i| samples.get(i).copied().unwrap_or(0.0) * self.window[i])
            .collect();

        let mut out = [0u8; FREQUENCY_BIN_COUNT];
        for (k, slot) in out.iter_mut().enumerate() {
            let (mut re, mut im) = (0.0f32, 0.0f32);
            for (n, sample) in windowed.iter().enumerate() {
                let angle = 2.0 * PI * ((k * n) % FFT_SIZE) as f32 / FFT_SIZE as f32;
                re += sample * angle.cos();
                im -= sample * angle.sin();
            }
            let magnitude = (re * re + im * im).sqrt() / FFT_SIZE as f32;

            let smoothed = SMOOTHING_TIME_CONSTANT * self.smoothed[k]
                + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
            self.smoothed[k] = smoothed;

            *slot = to_byte(smoothed);
        }
        out
    }

    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }
}

fn to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.clamp(0.0, 255.0) as u8
}
