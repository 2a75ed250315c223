//! Levelcounter Core - Level-crossing edge detection for audio streams
//!
//! This library counts threshold crossings of a smoothed audio amplitude
//! signal. Each sample passes through a low-pass [`Smoother`], the smoothed
//! value is compared against a configurable level, and rising/falling
//! transitions are accumulated in a counter that other threads can drain
//! without blocking the audio thread.

pub mod audio;
pub mod config;
pub mod stats;

pub use audio::{
    edge::{ControlError, EdgeCounter, EdgeCounterHandle, EdgeKind},
    processor::SampleProcessor,
    signal::{SignalGenerator, Waveform},
    smoother::{LowPassFilter, Passthrough, Smoother},
};
pub use config::{ConfigError, CounterConfig};
pub use stats::store::EdgeStats;

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date stamped by build.rs
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Default sample rate for audio processing
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default low-pass cutoff for the smoothing stage
pub const DEFAULT_CUTOFF_HZ: f32 = 200.0;
