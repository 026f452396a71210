//! Provider session state and renewal

use super::provider::ExamProvider;
use crate::domain::Result;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Provider tokens expire after this many days
pub const TOKEN_LIFETIME_DAYS: i64 = 7;

/// An authenticated provider session
///
/// Lives for one process run and is never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub token: String,
    pub token_issued_at: DateTime<Utc>,
}

impl Session {
    /// `basic base64(user_id:token)`, built from the trimmed values
    pub fn authorization_header(&self) -> String {
        let credentials = format!("{}:{}", self.user_id.trim(), self.token.trim());
        format!("basic {}", general_purpose::STANDARD.encode(credentials))
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.token_issued_at
    }

    /// True once the session is at least `renew_after` old
    pub fn needs_renewal_at(&self, now: DateTime<Utc>, renew_after: Duration) -> bool {
        self.age_at(now) >= renew_after
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("token", &"[REDACTED]")
            .field("token_issued_at", &self.token_issued_at)
            .finish()
    }
}

/// Owns the current session and renews it before the token expires
pub struct SessionManager {
    provider: Arc<dyn ExamProvider>,
    renew_after: Duration,
    current: Mutex<Option<Session>>,
}

impl SessionManager {
    /// `renewal_days` is clamped to `1..TOKEN_LIFETIME_DAYS`
    pub fn new(provider: Arc<dyn ExamProvider>, renewal_days: i64) -> Self {
        let days = renewal_days.clamp(1, TOKEN_LIFETIME_DAYS - 1);
        Self {
            provider,
            renew_after: Duration::days(days),
            current: Mutex::new(None),
        }
    }

    /// Returns the cached session or opens a new one when absent or aging
    pub async fn ensure_valid_session(&self) -> Result<Session> {
        self.ensure_valid_session_at(Utc::now()).await
    }

    /// [`ensure_valid_session`](Self::ensure_valid_session) with an injected clock
    pub async fn ensure_valid_session_at(&self, now: DateTime<Utc>) -> Result<Session> {
        let mut current = self.current.lock().await;

        if let Some(session) = current.as_ref() {
            if !session.needs_renewal_at(now, self.renew_after) {
                return Ok(session.clone());
            }
            tracing::info!(
                session_id = %session.session_id,
                age_hours = session.age_at(now).num_hours(),
                "Session token aging, renewing"
            );
        }

        let session = self.provider.open_session().await?;
        tracing::info!(session_id = %session.session_id, "Provider session opened");
        *current = Some(session.clone());
        Ok(session)
    }

    /// Forces a fresh credential exchange, used after a 401
    pub async fn renew(&self) -> Result<Session> {
        let mut current = self.current.lock().await;
        let session = self.provider.open_session().await?;
        tracing::info!(session_id = %session.session_id, "Provider session renewed");
        *current = Some(session.clone());
        Ok(session)
    }
}
