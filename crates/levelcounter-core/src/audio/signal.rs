//! Test signal generation
//!
//! Produces square or sine waves with optional white noise so the edge
//! counter can be driven with a known number of level crossings.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Initial PRNG state for the noise source
const NOISE_SEED: u32 = 0xDEADBEEF;

/// Shape of the generated signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    /// `offset + amplitude` for the first half of each cycle, `offset - amplitude` for the second
    #[default]
    Square,
    /// `offset + amplitude * sin(2π · phase)`
    Sine,
}

/// Periodic test signal generator
///
/// Phase is derived from the absolute sample index, so long runs do not
/// accumulate rounding drift.
///
/// # Example
/// ```
/// use levelcounter_core::audio::signal::{SignalGenerator, Waveform};
///
/// let mut gen = SignalGenerator::new(Waveform::Square, 100.0, 48000);
/// assert_eq!(gen.next_sample(), 1.0);
/// assert_eq!(gen.period_samples(), 480.0);
/// ```
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    /// Signal shape
    waveform: Waveform,
    /// Frequency in Hz
    frequency: f64,
    /// Sample rate in Hz
    sample_rate: u32,
    /// Peak deviation from the offset
    amplitude: f32,
    /// DC offset
    offset: f32,
    /// Peak amplitude of additive white noise
    noise_amplitude: f32,
    /// Index of the next sample
    index: u64,
    /// PRNG state for noise generation
    noise_seed: u32,
}

impl SignalGenerator {
    /// Create a generator with unit amplitude, no offset and no noise
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: u32) -> Self {
        Self {
            waveform,
            frequency,
            sample_rate,
            amplitude: 1.0,
            offset: 0.0,
            noise_amplitude: 0.0,
            index: 0,
            noise_seed: NOISE_SEED,
        }
    }

    /// Set peak amplitude (builder style)
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.abs();
        self
    }

    /// Set DC offset (builder style)
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    /// Set peak noise amplitude (builder style)
    pub fn with_noise(mut self, noise_amplitude: f32) -> Self {
        self.noise_amplitude = noise_amplitude.abs();
        self
    }

    fn cycles_at(&self, index: u64) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        index as f64 * self.frequency / self.sample_rate as f64
    }

    /// Generate a single noise sample in -1.0..1.0 using an LCG PRNG
    fn generate_noise(&mut self) -> f32 {
        // LCG parameters (same as glibc)
        self.noise_seed = self.noise_seed.wrapping_mul(1103515245).wrapping_add(12345);
        let bits = (self.noise_seed >> 16) & 0x7FFF;
        (bits as f32 / 16384.0) - 1.0
    }

    /// Get the next sample
    pub fn next_sample(&mut self) -> f32 {
        let phase = self.cycles_at(self.index).fract();
        self.index += 1;

        let shape = match self.waveform {
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sine => (TAU * phase).sin() as f32,
        };

        let mut sample = self.offset + self.amplitude * shape;
        if self.noise_amplitude > 0.0 {
            sample += self.generate_noise() * self.noise_amplitude;
        }
        sample
    }

    /// Fill a buffer with sequential samples
    pub fn fill_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Number of half-cycle boundaries within the next `samples` samples
    ///
    /// For a noise-free square wave compared against a level strictly
    /// between its low and high values this is exactly the number of
    /// counted edges, since the first sample only seeds the edge state.
    /// Returns `None` for sine waves.
    pub fn expected_edges(&self, samples: u64) -> Option<u64> {
        if self.waveform != Waveform::Square {
            return None;
        }
        if samples == 0 {
            return Some(0);
        }
        let half_cycle = |index: u64| (2.0 * self.cycles_at(index)).floor() as u64;
        let last = self.index.saturating_add(samples - 1);
        Some(half_cycle(last).saturating_sub(half_cycle(self.index)))
    }

    /// Restart at phase zero with the initial noise seed
    pub fn reset(&mut self) {
        self.index = 0;
        self.noise_seed = NOISE_SEED;
    }

    /// Period length in samples
    pub fn period_samples(&self) -> f64 {
        self.sample_rate as f64 / self.frequency
    }

    /// Get waveform
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Get frequency in Hz
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get amplitude
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Number of samples generated since creation or reset
    pub fn position(&self) -> u64 {
        self.index
    }
}
