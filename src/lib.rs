//! Levelcounter - level-crossing edge counter for audio streams
//!
//! This library re-exports the edge counter, smoothing stages and statistics
//! from `levelcounter-core`, and adds the [`monitor`] loop used by the CLI.

pub mod monitor;

pub use levelcounter_core::audio;
pub use levelcounter_core::config;
pub use levelcounter_core::stats;

pub use levelcounter_core::{
    CounterConfig, EdgeCounter, EdgeCounterHandle, EdgeKind, EdgeStats, LowPassFilter,
    SampleProcessor, Smoother,
};
pub use levelcounter_core::{BUILD_DATE, DEFAULT_CUTOFF_HZ, DEFAULT_SAMPLE_RATE, VERSION};
