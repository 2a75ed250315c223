//! Statistics storage
//!
//! Collects periodically drained edge counts for rate reporting.

pub mod store;
