//! # examsync - Biologix exam sync and clinic alerts
//!
//! examsync pulls completed sleep and oximetry exams from the Biologix
//! partner API into a clinic's PostgreSQL database, then evaluates a set of
//! operational alert rules over the synced patients and exams.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Authenticating** against the provider with renewable session tokens
//! - **Fetching** the partner's exam listing page by page, keeping completed exams
//! - **Mapping** raw records to patients and exams (fiscal id, BMI, snoring score)
//! - **Upserting** idempotently, so reruns update rather than duplicate
//! - **Alerting** on maintenance dates, follow-ups, non-responders and critical exams
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Sync pipeline, mapping, retry and alert rules
//! - [`adapters`] - Biologix HTTP client, PostgreSQL and in-memory stores
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use examsync::adapters::biologix::{BiologixClient, ExamProvider, SessionManager};
//! use examsync::adapters::database::create_stores;
//! use examsync::config::load_config;
//! use examsync::core::retry::RetryPolicy;
//! use examsync::core::sync::{ExternalRecordFetcher, SyncOrchestrator, UpsertEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("examsync.toml")?;
//!     let stores = create_stores(&config.postgresql).await?;
//!
//!     let provider: Arc<dyn ExamProvider> = Arc::new(BiologixClient::new(&config.provider)?);
//!     let sessions = Arc::new(SessionManager::new(provider.clone(), 6));
//!     let retry = RetryPolicy::from_config(&config.provider.retry);
//!     let fetcher = ExternalRecordFetcher::new(provider, sessions.clone(), retry.clone(), 100);
//!
//!     let orchestrator =
//!         SyncOrchestrator::new(sessions, fetcher, UpsertEngine::new(stores.clinic), retry);
//!     let summary = orchestrator.run().await?;
//!
//!     println!("Synced {} of {} exams", summary.processed, summary.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library code returns [`domain::Result`] with [`domain::ExamSyncError`].
//! Authentication and fetch failures abort a run; a record that cannot be
//! mapped or written is counted and the run continues.
//!
//! ```rust,no_run
//! use examsync::domain::ExamSyncError;
//!
//! fn example() -> Result<(), ExamSyncError> {
//!     let config = examsync::config::load_config("examsync.toml")?;
//!     println!("{}", config.provider.partner_id);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
