//! Expiry notification pipeline.
//!
//! # Responsibility
//! - Decide which items are due for a reminder today.
//! - Dispatch reminders through a pluggable sender.
//!
//! # Invariants
//! - At most one reminder per item per calendar day.
//! - Marker updates are never rolled back after a failed dispatch.

pub mod reconcile;
pub mod sender;
