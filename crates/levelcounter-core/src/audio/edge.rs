//! Level-crossing edge counter
//!
//! Smooths every incoming sample, compares it against a threshold level and
//! counts transitions of the smoothed signal across that level in both
//! directions. The first sample after construction or [`EdgeCounter::reset`]
//! only establishes which side of the level the signal is on.
//!
//! ## Threading
//!
//! [`EdgeCounter`] is owned by the audio thread. Control threads observe and
//! drain it through an [`EdgeCounterHandle`]:
//! - Edge and count share one `AtomicU64`, so a transition, a read-and-reset
//!   and a full reset are each a single atomic operation.
//! - The level is an `AtomicU32` holding the `f32` bit pattern.
//! - Smoother replacement is handed over on a bounded lock-free channel and
//!   installed by the audio thread before its next sample. The displaced
//!   smoother is sent back so it is dropped off the audio thread.

use crate::audio::processor::SampleProcessor;
use crate::audio::smoother::{LowPassFilter, Smoother};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Number of displaced smoothers that can wait for collection
const RETIRED_CAPACITY: usize = 4;

/// Low 32 bits of the packed state hold the count
const COUNT_MASK: u64 = 0xFFFF_FFFF;

/// Edge kind occupies the bits above the count
const EDGE_SHIFT: u32 = 32;

/// Errors returned by [`EdgeCounterHandle`] control operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    #[error("A smoother replacement is already waiting to be installed")]
    SmootherPending,

    #[error("Edge counter has been dropped")]
    Disconnected,
}

/// Direction of the last observed level crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum EdgeKind {
    /// No sample observed since construction or reset
    #[default]
    Unknown = 0,
    /// Smoothed signal is at or above the level
    Rising = 1,
    /// Smoothed signal is below the level
    Falling = 2,
}

impl EdgeKind {
    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => EdgeKind::Rising,
            2 => EdgeKind::Falling,
            _ => EdgeKind::Unknown,
        }
    }

    /// Apply one comparison result to this state
    ///
    /// Returns the next state and whether the step is a counted edge.
    /// Leaving `Unknown` seeds the side without counting.
    pub fn step(self, is_above: bool) -> (EdgeKind, bool) {
        let side = if is_above {
            EdgeKind::Rising
        } else {
            EdgeKind::Falling
        };
        match self {
            EdgeKind::Unknown => (side, false),
            current if current == side => (current, false),
            _ => (side, true),
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeKind::Unknown => "unknown",
            EdgeKind::Rising => "rising",
            EdgeKind::Falling => "falling",
        };
        f.write_str(name)
    }
}

fn pack(edge: EdgeKind, count: u32) -> u64 {
    ((edge as u64) << EDGE_SHIFT) | count as u64
}

fn unpack(bits: u64) -> (EdgeKind, u32) {
    (
        EdgeKind::from_bits((bits >> EDGE_SHIFT) as u8),
        (bits & COUNT_MASK) as u32,
    )
}

/// State visible to both the audio thread and control threads
#[derive(Debug)]
struct SharedState {
    /// Packed edge kind and count
    state: AtomicU64,
    /// Threshold level as `f32` bits
    level: AtomicU32,
}

impl SharedState {
    fn new(level: f32) -> Self {
        Self {
            state: AtomicU64::new(pack(EdgeKind::Unknown, 0)),
            level: AtomicU32::new(level.to_bits()),
        }
    }

    fn level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Acquire))
    }

    fn set_level(&self, level: f32) {
        self.level.store(level.to_bits(), Ordering::Release);
    }

    fn current_edge(&self) -> EdgeKind {
        unpack(self.state.load(Ordering::Acquire)).0
    }

    fn counter(&self) -> u32 {
        unpack(self.state.load(Ordering::Acquire)).1
    }

    fn counter_and_reset(&self) -> u32 {
        let previous = self.state.fetch_and(!COUNT_MASK, Ordering::AcqRel);
        unpack(previous).1
    }

    fn reset(&self) {
        self.state
            .store(pack(EdgeKind::Unknown, 0), Ordering::Release);
    }

    /// Record a comparison result; only writes when the side changes
    fn observe(&self, is_above: bool) {
        let (edge, _) = unpack(self.state.load(Ordering::Acquire));
        if edge.step(is_above).0 == edge {
            return;
        }
        // A control thread may reset or drain between load and update, so
        // the transition is recomputed against whatever state is current.
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let (edge, count) = unpack(bits);
                match edge.step(is_above) {
                    (next, _) if next == edge => None,
                    (next, true) => Some(pack(next, count.saturating_add(1))),
                    (next, false) => Some(pack(next, count)),
                }
            });
    }
}

/// Level-crossing edge counter
///
/// Acts as a pass-through [`SampleProcessor`]: samples are returned
/// unchanged while their smoothed values drive the edge state machine.
///
/// # Example
/// ```
/// use levelcounter_core::audio::edge::{EdgeCounter, EdgeKind};
/// use levelcounter_core::audio::processor::SampleProcessor;
/// use levelcounter_core::audio::smoother::Passthrough;
///
/// let mut counter = EdgeCounter::with_smoother(0.0, Passthrough);
/// for i in 0..10 {
///     let sample = if i % 2 == 0 { 1.0 } else { -1.0 };
///     assert_eq!(counter.process_sample(sample), sample);
/// }
/// assert_eq!(counter.counter(), 9);
/// assert_eq!(counter.current_edge(), EdgeKind::Falling);
/// ```
pub struct EdgeCounter {
    /// Edge, count and level shared with handles
    shared: Arc<SharedState>,
    /// Owned smoothing stage
    smoother: Box<dyn Smoother>,
    /// Replacement smoothers queued by handles
    pending_rx: Receiver<Box<dyn Smoother>>,
    /// Kept so handles can be created on demand
    pending_tx: Sender<Box<dyn Smoother>>,
    /// Displaced smoothers returned for dropping off the audio thread
    retired_tx: Sender<Box<dyn Smoother>>,
    /// Kept so handles can be created on demand
    retired_rx: Receiver<Box<dyn Smoother>>,
}

impl EdgeCounter {
    /// Create an edge counter with the default [`LowPassFilter`]
    ///
    /// # Example
    /// ```
    /// use levelcounter_core::audio::edge::{EdgeCounter, EdgeKind};
    ///
    /// let counter = EdgeCounter::new(0.25);
    /// assert_eq!(counter.level(), 0.25);
    /// assert_eq!(counter.current_edge(), EdgeKind::Unknown);
    /// assert_eq!(counter.counter(), 0);
    /// ```
    pub fn new(level: f32) -> Self {
        Self::with_smoother(level, LowPassFilter::default())
    }

    /// Create an edge counter that owns the given smoother
    pub fn with_smoother<S: Smoother + 'static>(level: f32, smoother: S) -> Self {
        let (pending_tx, pending_rx) = crossbeam_channel::bounded(1);
        let (retired_tx, retired_rx) = crossbeam_channel::bounded(RETIRED_CAPACITY);

        tracing::debug!(level, "Edge counter created");

        Self {
            shared: Arc::new(SharedState::new(level)),
            smoother: Box::new(smoother),
            pending_rx,
            pending_tx,
            retired_tx,
            retired_rx,
        }
    }

    /// Create a control handle for use from other threads
    pub fn handle(&self) -> EdgeCounterHandle {
        EdgeCounterHandle {
            shared: Arc::clone(&self.shared),
            pending_tx: self.pending_tx.clone(),
            retired_rx: self.retired_rx.clone(),
        }
    }

    /// Get threshold level
    pub fn level(&self) -> f32 {
        self.shared.level()
    }

    /// Set threshold level; applies from the next sample on
    pub fn set_level(&mut self, level: f32) {
        self.shared.set_level(level);
    }

    /// Replace the owned smoother, discarding the previous one and its history
    ///
    /// Edge state and count are left untouched.
    pub fn set_smoother<S: Smoother + 'static>(&mut self, smoother: S) {
        self.smoother = Box::new(smoother);
        tracing::debug!("Smoother replaced");
    }

    /// Clear the owned smoother's filter memory
    pub fn reset_smoother(&mut self) {
        self.smoother.reset();
    }

    /// Direction of the last observed crossing
    pub fn current_edge(&self) -> EdgeKind {
        self.shared.current_edge()
    }

    /// Edges counted since the last reset
    pub fn counter(&self) -> u32 {
        self.shared.counter()
    }

    /// Read the count and zero it in one atomic step
    pub fn counter_and_reset(&mut self) -> u32 {
        self.shared.counter_and_reset()
    }

    /// Zero the count and return to [`EdgeKind::Unknown`]
    ///
    /// The smoother's history is kept; see [`Self::reset_smoother`].
    pub fn reset(&mut self) {
        self.shared.reset();
    }

    fn install_pending_smoother(&mut self) {
        if let Ok(next) = self.pending_rx.try_recv() {
            let previous = std::mem::replace(&mut self.smoother, next);
            // If nobody collects retired smoothers the old one is dropped here
            let _ = self.retired_tx.try_send(previous);
        }
    }
}

impl SampleProcessor for EdgeCounter {
    /// Smooth, compare and count; the raw sample is returned unchanged.
    ///
    /// A NaN smoothed value (or NaN level) never compares as above the
    /// level, so it is treated as a below-level sample.
    fn process_sample(&mut self, sample: f32) -> f32 {
        self.install_pending_smoother();

        let smoothed = self.smoother.process(sample);
        let is_above = smoothed >= self.shared.level();
        self.shared.observe(is_above);

        sample
    }
}

impl fmt::Debug for EdgeCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeCounter")
            .field("level", &self.level())
            .field("current_edge", &self.current_edge())
            .field("counter", &self.counter())
            .finish_non_exhaustive()
    }
}

/// Cloneable, thread-safe control handle for an [`EdgeCounter`]
///
/// Every operation is lock-free and may run concurrently with the audio
/// thread's sample processing.
#[derive(Debug, Clone)]
pub struct EdgeCounterHandle {
    shared: Arc<SharedState>,
    pending_tx: Sender<Box<dyn Smoother>>,
    retired_rx: Receiver<Box<dyn Smoother>>,
}

impl EdgeCounterHandle {
    /// Get threshold level
    pub fn level(&self) -> f32 {
        self.shared.level()
    }

    /// Set threshold level; the audio thread sees it on its next sample
    pub fn set_level(&self, level: f32) {
        self.shared.set_level(level);
        tracing::debug!(level, "Level updated");
    }

    /// Direction of the last observed crossing
    pub fn current_edge(&self) -> EdgeKind {
        self.shared.current_edge()
    }

    /// Edges counted since the last reset
    pub fn counter(&self) -> u32 {
        self.shared.counter()
    }

    /// Read the count and zero it without losing concurrent increments
    pub fn counter_and_reset(&self) -> u32 {
        self.shared.counter_and_reset()
    }

    /// Zero the count and return to [`EdgeKind::Unknown`]
    pub fn reset(&self) {
        self.shared.reset();
        tracing::debug!("Edge counter reset");
    }

    /// Queue a replacement smoother for the audio thread to install
    ///
    /// Retired smoothers from earlier replacements are dropped first.
    ///
    /// # Errors
    /// [`ControlError::SmootherPending`] if a previous replacement has not
    /// been installed yet, [`ControlError::Disconnected`] if the counter is gone.
    pub fn set_smoother<S: Smoother + 'static>(&self, smoother: S) -> Result<(), ControlError> {
        self.collect_retired();
        match self.pending_tx.try_send(Box::new(smoother)) {
            Ok(()) => {
                tracing::debug!("Smoother replacement queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(ControlError::SmootherPending),
            Err(TrySendError::Disconnected(_)) => Err(ControlError::Disconnected),
        }
    }

    /// Whether a queued smoother is still waiting to be installed
    pub fn smoother_pending(&self) -> bool {
        !self.pending_tx.is_empty()
    }

    /// Drop smoothers displaced by the audio thread; returns how many
    pub fn collect_retired(&self) -> usize {
        self.retired_rx.try_iter().count()
    }
}
