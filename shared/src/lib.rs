//! Shared types and models for the Inventory ERP Platform
//!
//! This crate contains domain types shared between the backend and other
//! components of the system, plus the pure stock reconciliation planner.

pub mod models;
pub mod reconciliation;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
