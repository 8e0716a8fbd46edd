//! Durable client-side state.
//!
//! # Responsibility
//! - Provide named key-value slots over memory or SQLite.
//! - Persist the per-item notification markers on top of those slots.

pub mod flag_store;
pub mod slot;
