//! Storage abstraction layer
//!
//! Trait contracts used by the sync engine and the alert rules, plus the
//! factory that picks an implementation.

pub mod factory;
pub mod traits;

pub use factory::{create_in_memory_stores, create_stores, Stores};
pub use traits::{AlertStore, ClinicStore};
