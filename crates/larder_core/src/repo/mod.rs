//! Repository layer for item persistence.
//!
//! # Responsibility
//! - Define CRUD contracts used by the inventory service and local item source.
//! - Isolate SQLite query details from orchestration code.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod item_repo;
