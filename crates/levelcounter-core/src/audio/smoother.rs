//! Smoothing stages used ahead of threshold comparison
//!
//! A [`Smoother`] attenuates high-frequency noise so that transient spikes
//! do not produce spurious level crossings. [`LowPassFilter`] is the default
//! stage; [`Passthrough`] compares the raw signal directly.

use crate::audio::processor::SampleProcessor;
use std::f32::consts::PI;

/// Single-input, single-output smoothing stage
///
/// `process` must run in constant time without allocating or blocking,
/// since it is called from the audio thread for every sample.
pub trait Smoother: Send {
    /// Smooth one raw sample
    fn process(&mut self, sample: f32) -> f32;

    /// Clear internal filter memory
    fn reset(&mut self);
}

/// Single-pole IIR low-pass filter
///
/// `y[n] = y[n-1] + alpha * (x[n] - y[n-1])` with
/// `alpha = 1 - exp(-2π · cutoff / sample_rate)`.
///
/// The first sample after creation or reset initializes the state, so a
/// signal with a DC offset does not ramp up from zero.
///
/// # Example
/// ```
/// use levelcounter_core::audio::smoother::{LowPassFilter, Smoother};
///
/// let mut filter = LowPassFilter::new(100.0, 48000);
/// assert_eq!(filter.process(0.0), 0.0);
/// let y = filter.process(1.0);
/// assert!(y > 0.0 && y < 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    /// Cutoff frequency in Hz
    cutoff_hz: f32,
    /// Sample rate in Hz
    sample_rate: u32,
    /// Smoothing coefficient in (0, 1]
    alpha: f32,
    /// Previous output
    state: f32,
    /// Whether `state` holds a real sample yet
    primed: bool,
}

impl LowPassFilter {
    /// Create a filter with the given cutoff at the given sample rate
    ///
    /// A non-positive or non-finite cutoff disables smoothing (alpha = 1).
    pub fn new(cutoff_hz: f32, sample_rate: u32) -> Self {
        Self {
            cutoff_hz,
            sample_rate,
            alpha: Self::cutoff_to_alpha(cutoff_hz, sample_rate),
            state: 0.0,
            primed: false,
        }
    }

    fn cutoff_to_alpha(cutoff_hz: f32, sample_rate: u32) -> f32 {
        if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 || sample_rate == 0 {
            return 1.0;
        }
        let alpha = 1.0 - (-2.0 * PI * cutoff_hz / sample_rate as f32).exp();
        alpha.clamp(f32::EPSILON, 1.0)
    }

    /// Change the cutoff frequency, keeping the current filter state
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = cutoff_hz;
        self.alpha = Self::cutoff_to_alpha(cutoff_hz, self.sample_rate);
    }

    /// Get cutoff frequency in Hz
    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get smoothing coefficient
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Get the last output value
    pub fn value(&self) -> f32 {
        self.state
    }
}

impl Default for LowPassFilter {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CUTOFF_HZ, crate::DEFAULT_SAMPLE_RATE)
    }
}

impl Smoother for LowPassFilter {
    fn process(&mut self, sample: f32) -> f32 {
        if self.primed {
            self.state += self.alpha * (sample - self.state);
        } else {
            self.state = sample;
            self.primed = true;
        }
        self.state
    }

    fn reset(&mut self) {
        self.state = 0.0;
        self.primed = false;
    }
}

impl SampleProcessor for LowPassFilter {
    fn process_sample(&mut self, sample: f32) -> f32 {
        self.process(sample)
    }
}

/// Identity stage: the raw sample is compared unmodified
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Smoother for Passthrough {
    fn process(&mut self, sample: f32) -> f32 {
        sample
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_filter() {
        let filter = LowPassFilter::default();
        assert_eq!(filter.sample_rate(), crate::DEFAULT_SAMPLE_RATE);
        assert_eq!(filter.cutoff(), crate::DEFAULT_CUTOFF_HZ);
        assert!(filter.alpha() > 0.0 && filter.alpha() < 1.0);
    }

    #[test]
    fn test_first_sample_primes_state() {
        let mut filter = LowPassFilter::new(10.0, 48000);
        assert_eq!(filter.process(0.8), 0.8);
        assert!(filter.process(0.0) > 0.79);
    }

    #[test]
    fn test_step_response_converges() {
        let mut filter = LowPassFilter::new(100.0, 48000);
        filter.process(0.0);
        let mut y = 0.0;
        for _ in 0..48000 {
            y = filter.process(1.0);
        }
        assert_relative_eq!(y, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_step_response_is_monotonic() {
        let mut filter = LowPassFilter::new(50.0, 48000);
        filter.process(0.0);
        let mut prev = 0.0;
        for _ in 0..1000 {
            let y = filter.process(1.0);
            assert!(y >= prev, "Step response should not overshoot");
            prev = y;
        }
    }

    #[test]
    fn test_attenuates_alternating_signal() {
        let mut filter = LowPassFilter::new(20.0, 48000);
        filter.process(0.0);
        let mut peak = 0.0f32;
        for i in 0..10000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            peak = peak.max(filter.process(x).abs());
        }
        assert!(
            peak < 0.01,
            "Nyquist-rate signal should be attenuated, peak {}",
            peak
        );
    }

    #[test]
    fn test_reset_clears_history() {
        let mut filter = LowPassFilter::new(100.0, 48000);
        for _ in 0..100 {
            filter.process(1.0);
        }
        assert!(filter.value() > 0.0);
        filter.reset();
        assert_eq!(filter.value(), 0.0);
        // Primes again from the next sample
        assert_eq!(filter.process(-0.5), -0.5);
    }

    #[test]
    fn test_set_cutoff_recomputes_alpha() {
        let mut filter = LowPassFilter::new(100.0, 48000);
        let low = filter.alpha();
        filter.set_cutoff(1000.0);
        assert!(filter.alpha() > low);
        assert_eq!(filter.cutoff(), 1000.0);
    }

    #[test]
    fn test_invalid_cutoff_disables_smoothing() {
        for cutoff in [0.0, -5.0, f32::NAN, f32::INFINITY] {
            let mut filter = LowPassFilter::new(cutoff, 48000);
            assert_eq!(filter.alpha(), 1.0);
            assert_eq!(filter.process(0.3), 0.3);
        }
    }

    #[test]
    fn test_passthrough_is_identity() {
        let mut smoother = Passthrough;
        for x in [-1.0f32, 0.0, 0.5, 3.25] {
            assert_eq!(smoother.process(x), x);
        }
    }
}
