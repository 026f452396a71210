//! Biologix provider adapter
//!
//! Session-token authentication and paginated exam listing over HTTP.

pub mod client;
pub mod models;
pub mod provider;
pub mod session;

pub use client::BiologixClient;
pub use models::{ExamPage, Pagination, RawExamRecord};
pub use provider::ExamProvider;
pub use session::{Session, SessionManager};
