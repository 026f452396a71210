//! HTTP implementation of [`ExamProvider`] for the Biologix API

use super::models::{ExamPage, Pagination, RawExamRecord, SessionOpenRequest, SessionOpenResponse};
use super::provider::ExamProvider;
use super::session::Session;
use crate::config::{ProviderConfig, SecretString};
use crate::domain::{ExamSyncError, ProviderError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use std::time::Duration;
use url::Url;

const TOTAL_HEADER: &str = "x-pagination-total";
const LIMIT_HEADER: &str = "x-pagination-limit";
const OFFSET_HEADER: &str = "x-pagination-offset";

/// Biologix REST client
///
/// # Example
///
/// ```no_run
/// use examsync::adapters::biologix::{BiologixClient, ExamProvider};
/// use examsync::config::load_config;
///
/// # async fn example() -> examsync::domain::Result<()> {
/// let config = load_config("examsync.toml")?;
/// let client = BiologixClient::new(&config.provider)?;
/// let session = client.open_session().await?;
/// let page = client.fetch_page(&session, 0, 100).await?;
/// println!("{} of {}", page.records.len(), page.pagination.total);
/// # Ok(())
/// # }
/// ```
pub struct BiologixClient {
    base_url: Url,
    partner_id: String,
    username: String,
    password: SecretString,
    source: u32,
    /// Lowercased token header name
    token_header: String,
    client: Client,
}

impl BiologixClient {
    /// # Errors
    ///
    /// Returns a configuration error for an unparseable base URL or when the
    /// HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ExamSyncError::Configuration(format!("Invalid provider.base_url: {e}"))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(ExamSyncError::Configuration(format!(
                "provider.base_url cannot be used as a base: {}",
                config.base_url
            )));
        }

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .map_err(|e| {
                ExamSyncError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url,
            partner_id: config.partner_id.trim().to_string(),
            username: config.username.trim().to_string(),
            password: config.password.clone(),
            source: config.source,
            token_header: config.token_header.trim().to_ascii_lowercase(),
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    fn pagination_from(headers: &HeaderMap, offset: u64, limit: u64, page_len: usize) -> Pagination {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };

        Pagination {
            total: read(TOTAL_HEADER).unwrap_or(page_len as u64),
            limit: read(LIMIT_HEADER).filter(|l| *l > 0).unwrap_or(limit),
            offset: read(OFFSET_HEADER).unwrap_or(offset),
        }
    }
}

#[async_trait]
impl ExamProvider for BiologixClient {
    async fn open_session(&self) -> Result<Session> {
        let url = self.endpoint(&["sessions", "open"]);

        tracing::debug!(url = %url, username = %self.username, "Opening provider session");

        let body = SessionOpenRequest {
            username: &self.username,
            password: self.password.expose_secret().as_str().trim(),
            source: self.source,
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionFailed(format!("Failed to open session: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::AuthenticationFailed(format!("status {status}: {text}"))
                }
                _ => ProviderError::RequestFailed {
                    status: status.as_u16(),
                    message: text,
                },
            };
            return Err(err.into());
        }

        let token = response
            .headers()
            .get(self.token_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::MissingSessionToken(self.token_header.clone()))?;

        let opened: SessionOpenResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse session response: {e}"))
        })?;

        tracing::debug!(
            session_id = %opened.session_id,
            token_start = ?opened.token_start,
            mfa_verified = ?opened.mfa_verified,
            "Session token received"
        );

        Ok(Session {
            session_id: opened.session_id,
            user_id: opened.user_id,
            token,
            token_issued_at: Utc::now(),
        })
    }

    async fn fetch_page(&self, session: &Session, offset: u64, limit: u64) -> Result<ExamPage> {
        let url = self.endpoint(&["partners", self.partner_id.as_str(), "exams"]);

        tracing::debug!(offset, limit, "Fetching exam page");

        let response = self
            .client
            .get(url)
            .query(&[("offset", offset), ("limit", limit)])
            .header(AUTHORIZATION, session.authorization_header())
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionFailed(format!("Failed to list exams: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unauthorized(format!(
                "exam listing rejected at offset {offset}"
            ))
            .into());
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed {
                status: status.as_u16(),
                message: text,
            }
            .into());
        }

        let headers = response.headers().clone();
        let elements: Vec<serde_json::Value> = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse exam listing: {e}"))
        })?;
        let records: Vec<RawExamRecord> =
            elements.into_iter().map(RawExamRecord::from_value).collect();

        let pagination = Self::pagination_from(&headers, offset, limit, records.len());

        Ok(ExamPage {
            records,
            pagination,
        })
    }
}
