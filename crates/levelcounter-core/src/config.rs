//! Counter and test-signal configuration
//!
//! Stored as JSON. Every field has a default, so partial files load cleanly.

use crate::audio::edge::EdgeCounter;
use crate::audio::signal::{SignalGenerator, Waveform};
use crate::audio::smoother::LowPassFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading, saving or validating config
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

fn default_level() -> f32 {
    0.0
}

fn default_cutoff_hz() -> f32 {
    crate::DEFAULT_CUTOFF_HZ
}

fn default_sample_rate() -> u32 {
    crate::DEFAULT_SAMPLE_RATE
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_frequency() -> f64 {
    50.0
}

fn default_amplitude() -> f32 {
    0.5
}

/// Test signal settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Waveform shape
    #[serde(default)]
    pub waveform: Waveform,
    /// Frequency in Hz
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    /// Peak amplitude
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    /// DC offset
    #[serde(default)]
    pub offset: f32,
    /// Peak amplitude of additive white noise
    #[serde(default)]
    pub noise: f32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            waveform: Waveform::default(),
            frequency: default_frequency(),
            amplitude: default_amplitude(),
            offset: 0.0,
            noise: 0.0,
        }
    }
}

/// Edge counter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Threshold level
    #[serde(default = "default_level")]
    pub level: f32,
    /// Low-pass cutoff in Hz
    #[serde(default = "default_cutoff_hz")]
    pub cutoff_hz: f32,
    /// Sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Interval between counter drains in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Test signal settings
    #[serde(default)]
    pub signal: SignalConfig,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            cutoff_hz: default_cutoff_hz(),
            sample_rate: default_sample_rate(),
            poll_interval_ms: default_poll_interval_ms(),
            signal: SignalConfig::default(),
        }
    }
}

impl CounterConfig {
    /// Parse config from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize config as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load config from disk, falling back to defaults on any error
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded config from disk");
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to parse config, using defaults"
                    );
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save config to disk, creating parent directories if needed
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), "Config saved to disk");
        Ok(())
    }

    /// Check values that would make the counter or signal meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(invalid("sample_rate", "must be positive"));
        }
        if !self.cutoff_hz.is_finite() || self.cutoff_hz <= 0.0 {
            return Err(invalid("cutoff_hz", "must be a positive frequency"));
        }
        if !self.level.is_finite() {
            return Err(invalid("level", "must be finite"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be positive"));
        }
        let nyquist = self.sample_rate as f64 / 2.0;
        if !(self.signal.frequency > 0.0 && self.signal.frequency <= nyquist) {
            return Err(invalid(
                "signal.frequency",
                format!("must be in (0, {}] Hz", nyquist),
            ));
        }
        Ok(())
    }

    /// Build an edge counter with a low-pass smoother at the configured cutoff
    pub fn build_counter(&self) -> EdgeCounter {
        EdgeCounter::with_smoother(
            self.level,
            LowPassFilter::new(self.cutoff_hz, self.sample_rate),
        )
    }

    /// Build the configured test signal generator
    pub fn build_signal(&self) -> SignalGenerator {
        SignalGenerator::new(
            self.signal.waveform,
            self.signal.frequency,
            self.sample_rate,
        )
        .with_amplitude(self.signal.amplitude)
        .with_offset(self.signal.offset)
        .with_noise(self.signal.noise)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CounterConfig::default();
        assert_eq!(config.level, 0.0);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.signal.waveform, Waveform::Square);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let json = r#"{"level": 0.2, "signal": {"waveform": "sine"}}"#;
        let config = CounterConfig::from_json(json).unwrap();
        assert_eq!(config.level, 0.2);
        assert_eq!(config.cutoff_hz, crate::DEFAULT_CUTOFF_HZ);
        assert_eq!(config.signal.waveform, Waveform::Sine);
        assert_eq!(config.signal.frequency, 50.0);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = CounterConfig::from_json("{}").unwrap();
        assert_eq!(config, CounterConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        let err = CounterConfig::from_json("{ level: ").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = CounterConfig {
            level: -0.1,
            cutoff_hz: 75.0,
            sample_rate: 48000,
            poll_interval_ms: 250,
            signal: SignalConfig {
                waveform: Waveform::Sine,
                frequency: 120.0,
                amplitude: 0.8,
                offset: 0.05,
                noise: 0.02,
            },
        };
        config.save(&path).unwrap();

        assert_eq!(CounterConfig::load(&path), config);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CounterConfig::load(&dir.path().join("absent.json"));
        assert_eq!(config, CounterConfig::default());
    }

    #[test]
    fn test_load_corrupt_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(CounterConfig::load(&path), CounterConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: Vec<(&str, CounterConfig)> = vec![
            (
                "sample_rate",
                CounterConfig {
                    sample_rate: 0,
                    ..Default::default()
                },
            ),
            (
                "cutoff_hz",
                CounterConfig {
                    cutoff_hz: -1.0,
                    ..Default::default()
                },
            ),
            (
                "level",
                CounterConfig {
                    level: f32::NAN,
                    ..Default::default()
                },
            ),
            (
                "poll_interval_ms",
                CounterConfig {
                    poll_interval_ms: 0,
                    ..Default::default()
                },
            ),
            (
                "signal.frequency",
                CounterConfig {
                    signal: SignalConfig {
                        frequency: 30000.0,
                        ..Default::default()
                    },
                    ..Default::default()
                },
            ),
        ];

        for (expected_field, config) in cases {
            match config.validate() {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("Expected invalid {}, got {:?}", expected_field, other),
            }
        }
    }

    #[test]
    fn test_build_counter_and_signal() {
        let config = CounterConfig {
            level: 0.3,
            ..Default::default()
        };
        let counter = config.build_counter();
        assert_eq!(counter.level(), 0.3);
        assert_eq!(counter.counter(), 0);

        let signal = config.build_signal();
        assert_eq!(signal.sample_rate(), 44100);
        assert_eq!(signal.amplitude(), 0.5);
    }
}
