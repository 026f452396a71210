//! Core business logic for examsync.
//!
//! # Modules
//!
//! - [`mapping`] - raw provider records to domain records
//! - [`retry`] - bounded exponential backoff for provider calls
//! - [`sync`] - fetch, upsert and the run state machine
//! - [`alerts`] - rule engine and pending-alert deduplication
//!
//! # Sync Workflow
//!
//! 1. **Authenticate**: open (or reuse) a provider session
//! 2. **Fetch**: page through the partner's exams, keeping completed ones
//! 3. **Map**: extract fiscal id, scores and codes per record
//! 4. **Upsert**: resolve the patient and insert or overwrite the exam
//! 5. **Alerts**: evaluate the rules when the sync did not abort
//!
//! # Example
//!
//! ```rust,no_run
//! use examsync::adapters::biologix::{BiologixClient, ExamProvider, SessionManager};
//! use examsync::adapters::database::create_stores;
//! use examsync::config::load_config;
//! use examsync::core::retry::RetryPolicy;
//! use examsync::core::sync::{ExternalRecordFetcher, SyncOrchestrator, UpsertEngine};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("examsync.toml")?;
//! let stores = create_stores(&config.postgresql).await?;
//!
//! let provider: Arc<dyn ExamProvider> = Arc::new(BiologixClient::new(&config.provider)?);
//! let sessions = Arc::new(SessionManager::new(provider.clone(), 6));
//! let retry = RetryPolicy::from_config(&config.provider.retry);
//! let fetcher = ExternalRecordFetcher::new(provider, sessions.clone(), retry.clone(), 100);
//! let orchestrator =
//!     SyncOrchestrator::new(sessions, fetcher, UpsertEngine::new(stores.clinic), retry);
//!
//! let summary = orchestrator.run().await?;
//! println!("created {} updated {}", summary.created, summary.updated);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod mapping;
pub mod retry;
pub mod sync;
