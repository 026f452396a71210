//! External system integrations for examsync.
//!
//! - [`biologix`] - Biologix provider API (sessions, exam pages)
//! - [`database`] - Storage contracts and factory
//! - [`postgresql`] - PostgreSQL implementation
//! - [`memory`] - In-memory implementation for dry runs and tests
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits ([`biologix::ExamProvider`],
//! [`database::ClinicStore`], [`database::AlertStore`]) so the core can be
//! exercised with test doubles.
//!
//! ```rust,no_run
//! use examsync::adapters::biologix::{BiologixClient, SessionManager};
//! use examsync::config::load_config;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("examsync.toml")?;
//! let client = Arc::new(BiologixClient::new(&config.provider)?);
//! let sessions = SessionManager::new(client, config.provider.session_renewal_days);
//! let session = sessions.ensure_valid_session().await?;
//! println!("session for user {}", session.user_id);
//! # Ok(())
//! # }
//! ```

pub mod biologix;
pub mod database;
pub mod memory;
pub mod postgresql;
