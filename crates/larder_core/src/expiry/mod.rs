//! Expiry lifecycle classification.
//!
//! # Responsibility
//! - Derive an item's lifecycle tag from its expiry date and the current day.
//! - Provide the canonical date keys used by marker bookkeeping.
//!
//! # Invariants
//! - Classification compares calendar dates only; time of day never matters.
//! - Tags are derived per cycle and never stored.

pub mod classify;
