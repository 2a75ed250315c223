//! Audio processing module
//!
//! This module contains all sample-level functionality including:
//! - The per-sample processing capability ([`processor`])
//! - Low-pass smoothing stages ([`smoother`])
//! - Level-crossing edge counting ([`edge`])
//! - Square/sine test signal generation ([`signal`])

pub mod edge;
pub mod processor;
pub mod signal;
pub mod smoother;
