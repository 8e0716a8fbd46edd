//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into inventory use-cases.
//! - Keep CLI and controller layers decoupled from storage details.

pub mod inventory_service;
