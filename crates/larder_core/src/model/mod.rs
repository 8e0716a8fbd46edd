//! Domain model for tracked food items.
//!
//! # Responsibility
//! - Define the canonical item record read by classification and reconciliation.
//! - Validate user drafts before they reach storage.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId` across refresh cycles.
//! - Expiry dates carry no time-of-day component.

pub mod item;
