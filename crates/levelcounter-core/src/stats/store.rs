//! Edge-rate history built from periodic counter drains
//!
//! A control loop calls `counter_and_reset` on a fixed interval and records
//! each drained count here. The store keeps a bounded history of polls and
//! running totals for reporting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Maximum number of polls to keep in history
const MAX_HISTORY_SIZE: usize = 3600; // 1 hour at 1 poll/sec

/// A single drained count
#[derive(Debug, Clone, Serialize)]
pub struct EdgeMeasurement {
    /// When the counter was drained
    pub timestamp: DateTime<Utc>,
    /// Edges counted during the interval
    pub edges: u32,
    /// Length of the interval in seconds
    pub interval_secs: f64,
    /// Edges per second over the interval
    pub rate_hz: f64,
}

/// Running statistics across all recorded polls
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunningEdgeStats {
    /// Total edges since the store was created or cleared
    pub total_edges: u64,
    /// Number of recorded polls
    pub poll_count: u64,
    /// Total observed time in seconds
    pub elapsed_secs: f64,
    /// Rate of the most recent poll
    pub current_rate_hz: f64,
    /// Lowest poll rate
    pub min_rate_hz: f64,
    /// Highest poll rate
    pub max_rate_hz: f64,
    /// Mean rate over the whole observed time
    pub avg_rate_hz: f64,
}

/// Statistics store for drained edge counts
#[derive(Debug)]
pub struct EdgeStats {
    /// Recent polls, oldest first
    history: VecDeque<EdgeMeasurement>,
    /// Maximum history size
    max_size: usize,
    /// Running statistics
    stats: RunningEdgeStats,
}

impl EdgeStats {
    /// Create a new store with the default history size
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY_SIZE)
    }

    /// Create a store keeping at most `max_size` polls
    pub fn with_capacity(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            history: VecDeque::with_capacity(max_size.min(MAX_HISTORY_SIZE)),
            max_size,
            stats: Self::empty_stats(),
        }
    }

    fn empty_stats() -> RunningEdgeStats {
        RunningEdgeStats {
            min_rate_hz: f64::MAX,
            ..Default::default()
        }
    }

    /// Record a drained count timestamped now
    ///
    /// # Arguments
    /// * `edges` - Value returned by `counter_and_reset`
    /// * `interval` - Time since the previous drain
    pub fn record_poll(&mut self, edges: u32, interval: Duration) {
        self.record_poll_at(Utc::now(), edges, interval);
    }

    /// Record a drained count with an explicit timestamp
    pub fn record_poll_at(&mut self, timestamp: DateTime<Utc>, edges: u32, interval: Duration) {
        let interval_secs = interval.as_secs_f64();
        let rate_hz = if interval_secs > 0.0 {
            edges as f64 / interval_secs
        } else {
            0.0
        };

        if self.history.len() >= self.max_size {
            self.history.pop_front();
        }
        self.history.push_back(EdgeMeasurement {
            timestamp,
            edges,
            interval_secs,
            rate_hz,
        });

        self.stats.total_edges += edges as u64;
        self.stats.poll_count += 1;
        self.stats.elapsed_secs += interval_secs;
        self.stats.current_rate_hz = rate_hz;
        self.stats.min_rate_hz = self.stats.min_rate_hz.min(rate_hz);
        self.stats.max_rate_hz = self.stats.max_rate_hz.max(rate_hz);
        if self.stats.elapsed_secs > 0.0 {
            self.stats.avg_rate_hz = self.stats.total_edges as f64 / self.stats.elapsed_secs;
        }
    }

    /// Get poll history
    pub fn history(&self) -> &VecDeque<EdgeMeasurement> {
        &self.history
    }

    /// Get running statistics
    pub fn stats(&self) -> &RunningEdgeStats {
        &self.stats
    }

    /// Most recent poll, if any
    pub fn latest(&self) -> Option<&EdgeMeasurement> {
        self.history.back()
    }

    /// Get rate values for plotting (last N points)
    ///
    /// # Returns
    /// Vector of (time_offset_seconds, rate_hz) pairs, newest first
    pub fn rate_plot_data(&self, count: usize) -> Vec<(f64, f64)> {
        let now = Utc::now();
        self.history
            .iter()
            .rev()
            .take(count)
            .map(|m| {
                let time_offset = (now - m.timestamp).num_milliseconds() as f64 / 1000.0;
                (-time_offset, m.rate_hz)
            })
            .collect()
    }

    /// Clear all history and reset statistics
    pub fn clear(&mut self) {
        self.history.clear();
        self.stats = Self::empty_stats();
    }
}

impl Default for EdgeStats {
    fn default() -> Self {
        Self::new()
    }
}
