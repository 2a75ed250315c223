//! Real-time paced monitoring loop
//!
//! An audio thread generates the configured test signal in 10ms blocks and
//! feeds it through an [`EdgeCounter`](levelcounter_core::EdgeCounter),
//! sleeping to keep real-time pace. The calling thread acts as the control
//! side: it drains the counter every poll interval through a handle and
//! records the result in [`EdgeStats`].

use anyhow::{anyhow, Result};
use levelcounter_core::audio::edge::EdgeKind;
use levelcounter_core::audio::processor::SampleProcessor;
use levelcounter_core::stats::store::{EdgeMeasurement, EdgeStats};
use levelcounter_core::CounterConfig;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Audio block length in milliseconds
const BLOCK_MS: u64 = 10;

/// How often the control loop checks the stop flag
const CONTROL_TICK: Duration = Duration::from_millis(5);

/// Outcome of a monitoring run
#[derive(Debug)]
pub struct MonitorSummary {
    /// Drained counts, including the final drain after the audio thread stopped
    pub stats: EdgeStats,
    /// Samples processed by the audio thread
    pub samples_processed: u64,
    /// Half-cycle boundaries in the generated signal (square waves only)
    pub expected_edges: Option<u64>,
    /// Edge state when the audio thread stopped
    pub final_edge: EdgeKind,
}

impl MonitorSummary {
    /// Render the run summary as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        let report = serde_json::json!({
            "samples_processed": self.samples_processed,
            "expected_edges": self.expected_edges,
            "final_edge": self.final_edge,
            "stats": self.stats.stats(),
        });
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

/// Drives an edge counter with a generated signal until stopped
pub struct Monitor {
    config: CounterConfig,
    running: Arc<AtomicBool>,
}

impl Monitor {
    /// Create a monitor for a validated config
    pub fn new(config: CounterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Flag that stops the run when cleared (e.g. from a Ctrl+C handler)
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Get config
    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    /// Run until stopped or until `duration` has elapsed
    pub fn run(&self, duration: Option<Duration>) -> Result<MonitorSummary> {
        self.run_with(duration, |_, _| {})
    }

    /// Run, invoking `on_poll` after every periodic drain
    pub fn run_with<F>(&self, duration: Option<Duration>, mut on_poll: F) -> Result<MonitorSummary>
    where
        F: FnMut(&EdgeMeasurement, EdgeKind),
    {
        let sample_rate = self.config.sample_rate;
        let block_len = ((sample_rate as u64 * BLOCK_MS) / 1000).max(1) as usize;
        let block_period = Duration::from_secs_f64(block_len as f64 / sample_rate as f64);

        let mut counter = self.config.build_counter();
        let handle = counter.handle();
        let mut signal = self.config.build_signal();
        let reference = signal.clone();

        let samples_processed = Arc::new(AtomicU64::new(0));
        let produced = Arc::clone(&samples_processed);
        let running = Arc::clone(&self.running);

        let producer = thread::Builder::new()
            .name("levelcounter-audio".to_string())
            .spawn(move || {
                let mut block = vec![0.0f32; block_len];
                let start = Instant::now();
                let mut blocks: u32 = 0;
                while running.load(Ordering::Acquire) {
                    signal.fill_buffer(&mut block);
                    counter.process_buffer(&mut block);
                    produced.fetch_add(block_len as u64, Ordering::Release);

                    blocks = blocks.wrapping_add(1);
                    let deadline = start + block_period * blocks;
                    if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
                        thread::sleep(wait);
                    }
                }
            })?;

        tracing::info!(
            level = self.config.level,
            cutoff_hz = self.config.cutoff_hz,
            sample_rate,
            block_len,
            "Monitoring started"
        );

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut stats = EdgeStats::new();
        let started = Instant::now();
        let mut last_poll = started;

        while self.running.load(Ordering::Acquire) {
            let now = Instant::now();
            if duration.is_some_and(|limit| now.duration_since(started) >= limit) {
                break;
            }
            if now.duration_since(last_poll) >= poll_interval {
                let edges = handle.counter_and_reset();
                stats.record_poll(edges, now.duration_since(last_poll));
                last_poll = now;
                if let Some(latest) = stats.latest() {
                    tracing::debug!(edges, rate_hz = latest.rate_hz, "Counter drained");
                    on_poll(latest, handle.current_edge());
                }
            }
            thread::sleep(CONTROL_TICK);
        }

        self.running.store(false, Ordering::Release);
        producer
            .join()
            .map_err(|_| anyhow!("Audio thread panicked"))?;

        // Edges counted after the last periodic drain
        let now = Instant::now();
        stats.record_poll(handle.counter_and_reset(), now.duration_since(last_poll));

        let samples_processed = samples_processed.load(Ordering::Acquire);
        tracing::info!(
            samples_processed,
            total_edges = stats.stats().total_edges,
            "Monitoring stopped"
        );

        Ok(MonitorSummary {
            stats,
            samples_processed,
            expected_edges: reference.expected_edges(samples_processed),
            final_edge: handle.current_edge(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use levelcounter_core::config::SignalConfig;

    #[test]
    fn test_rejects_invalid_config() {
        let config = CounterConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(Monitor::new(config).is_err());
    }

    #[test]
    fn test_stop_flag_ends_run() {
        let monitor = Monitor::new(CounterConfig::default()).unwrap();
        monitor.stop_flag().store(false, Ordering::SeqCst);
        let summary = monitor.run(None).unwrap();
        // Final drain is always recorded
        assert_eq!(summary.stats.stats().poll_count, 1);
        assert_eq!(summary.final_edge, EdgeKind::Unknown);
    }

    #[test]
    fn test_summary_json_reports_final_edge() {
        let mut stats = EdgeStats::new();
        stats.record_poll(10, Duration::from_secs(1));
        let summary = MonitorSummary {
            stats,
            samples_processed: 44100,
            expected_edges: Some(10),
            final_edge: EdgeKind::Falling,
        };

        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["final_edge"], "falling");
        assert_eq!(json["expected_edges"], 10);
        assert_eq!(json["stats"]["total_edges"], 10);
    }

    #[test]
    fn test_short_run_counts_square_edges() {
        let config = CounterConfig {
            sample_rate: 8000,
            cutoff_hz: 1000.0,
            poll_interval_ms: 50,
            signal: SignalConfig {
                frequency: 40.0,
                amplitude: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let monitor = Monitor::new(config).unwrap();
        let mut polls = 0;
        let summary = monitor
            .run_with(Some(Duration::from_millis(300)), |_, _| polls += 1)
            .unwrap();

        assert!(summary.samples_processed > 0);
        let expected = summary.expected_edges.unwrap();
        let counted = summary.stats.stats().total_edges;
        // Smoothing lag can hold back at most the final crossing
        assert!(
            counted == expected || counted + 1 == expected,
            "counted {} edges, expected {}",
            counted,
            expected
        );
        assert!(polls >= 1);
    }
}
