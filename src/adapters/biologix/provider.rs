//! Provider trait definition
//!
//! `ExamProvider` abstracts the Biologix REST API so the fetcher and the
//! session manager can run against a test double.

use super::models::ExamPage;
use super::session::Session;
use crate::domain::Result;
use async_trait::async_trait;

/// Operations consumed from the exam provider
#[async_trait]
pub trait ExamProvider: Send + Sync {
    /// Exchange the configured credentials for a new session
    ///
    /// # Errors
    ///
    /// Returns a provider error when the credentials are rejected, the token
    /// header is missing, or the provider cannot be reached.
    async fn open_session(&self) -> Result<Session>;

    /// Fetch one page of the partner's exam listing
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unauthorized` on HTTP 401 so the caller can
    /// renew the session; other failures map to the remaining provider errors.
    async fn fetch_page(&self, session: &Session, offset: u64, limit: u64) -> Result<ExamPage>;
}
