//! PostgreSQL database integration
//!
//! Stores patients, exams and alerts in the `pacientes`, `exames` and
//! `alertas` tables.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
