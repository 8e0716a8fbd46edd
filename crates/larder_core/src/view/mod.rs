//! Display shaping for the item list.
//!
//! # Responsibility
//! - Apply search, sort and the default stale filter to loaded items.
//! - Attach lifecycle flags used to render expired rows read-only.

pub mod dashboard;
