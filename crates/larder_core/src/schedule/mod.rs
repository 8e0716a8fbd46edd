//! Calendar-driven background work.
//!
//! # Responsibility
//! - Reset notification markers at every local midnight.
//! - Expose a cancellable handle so long-running hosts can shut down cleanly.

pub mod day_boundary;
