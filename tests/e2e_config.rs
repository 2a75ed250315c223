//! E2E tests for config persistence and config-driven counting

use levelcounter::audio::processor::SampleProcessor;
use levelcounter::audio::signal::Waveform;
use levelcounter::config::{ConfigError, SignalConfig};
use levelcounter::CounterConfig;

#[test]
fn test_saved_config_drives_counter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("levelcounter").join("config.json");

    let config = CounterConfig {
        level: 0.1,
        cutoff_hz: 400.0,
        sample_rate: 48000,
        poll_interval_ms: 100,
        signal: SignalConfig {
            waveform: Waveform::Square,
            frequency: 25.0,
            amplitude: 0.6,
            offset: 0.1,
            noise: 0.0,
        },
    };
    config.save(&path).unwrap();

    let loaded = CounterConfig::load(&path);
    assert_eq!(loaded, config);
    loaded.validate().unwrap();

    let mut counter = loaded.build_counter();
    let mut signal = loaded.build_signal();
    let expected = signal.expected_edges(48000).unwrap();

    let mut buffer = vec![0.0f32; 48000];
    signal.fill_buffer(&mut buffer);
    counter.process_buffer(&mut buffer);

    assert_eq!(expected, 49);
    assert_eq!(counter.counter() as u64, expected);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"cutoff_hz": 30.0, "signal": {"noise": 0.25}}"#).unwrap();

    let config = CounterConfig::load(&path);
    assert_eq!(config.cutoff_hz, 30.0);
    assert_eq!(config.signal.noise, 0.25);
    assert_eq!(config.level, 0.0);
    assert_eq!(config.sample_rate, levelcounter::DEFAULT_SAMPLE_RATE);
    assert_eq!(config.signal.frequency, 50.0);
}

#[test]
fn test_json_round_trip_uses_lowercase_waveform() {
    let config = CounterConfig {
        signal: SignalConfig {
            waveform: Waveform::Sine,
            ..Default::default()
        },
        ..Default::default()
    };
    let json = config.to_json().unwrap();
    assert!(json.contains("\"sine\""));
    assert_eq!(CounterConfig::from_json(&json).unwrap(), config);
}

#[test]
fn test_validation_error_message_names_field() {
    let config = CounterConfig {
        cutoff_hz: 0.0,
        ..Default::default()
    };
    let err = config.validate().unwrap_err();
    let ConfigError::InvalidValue { field, .. } = &err else {
        panic!("Expected an invalid value error, got {:?}", err);
    };
    assert_eq!(*field, "cutoff_hz");
    assert!(err.to_string().contains("cutoff_hz"));
}
