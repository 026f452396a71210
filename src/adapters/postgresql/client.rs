//! PostgreSQL client implementation
//!
//! Owns the connection pool. TLS is negotiated through `native-tls` for every
//! `ssl_mode` except `disable`.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{ExamSyncError, Result, StoreError};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

/// PostgreSQL client for examsync
///
/// Provides pooled connections with the configured statement timeout applied.
pub struct PostgreSQLClient {
    /// Connection pool
    pool: Pool,

    /// Configuration
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// No connection is opened here; the pool connects lazily.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the connection string cannot be parsed
    /// or the TLS connector cannot be built.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let mut pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .as_str()
            .parse()
            .map_err(|e| {
                ExamSyncError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = match tls_connector(&config.ssl_mode)? {
            Some((ssl_mode, connector)) => {
                pg_config.ssl_mode(ssl_mode);
                Manager::from_config(pg_config, connector, manager_config)
            }
            None => {
                pg_config.ssl_mode(SslMode::Disable);
                Manager::from_config(pg_config, NoTls, manager_config)
            }
        };

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .build()
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to create connection pool: {e}"))
            })?;

        tracing::debug!(
            ssl_mode = %config.ssl_mode,
            max_connections = config.max_connections,
            "PostgreSQL pool created"
        );

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| StoreError::ConnectionFailed(format!("Connection test failed: {e}")))?;

        tracing::info!("PostgreSQL connection test successful");
        Ok(())
    }

    /// Apply the bundled schema
    ///
    /// Every statement is `IF NOT EXISTS`, so running it twice is harmless.
    pub async fn apply_schema(&self) -> Result<()> {
        let client = self.get_connection().await?;

        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");

        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to execute migration: {e}")))?;

        tracing::info!("PostgreSQL schema applied");
        Ok(())
    }

    /// Get a connection from the pool with the statement timeout set
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        let client = self.pool.get().await.map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to get connection from pool: {e}"))
        })?;

        let timeout_query = format!(
            "SET statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        );
        client
            .batch_execute(&timeout_query)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to set statement timeout: {e}")))?;

        Ok(client)
    }

    /// Execute a query and return rows
    pub async fn query(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        client
            .query(query, params)
            .await
            .map_err(|e| map_db_error("Query failed", e))
    }

    /// Execute a query expected to return at most one row
    pub async fn query_opt(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Option<Row>> {
        let client = self.get_connection().await?;
        client
            .query_opt(query, params)
            .await
            .map_err(|e| map_db_error("Query failed", e))
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(
        &self,
        statement: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<u64> {
        let client = self.get_connection().await?;
        client
            .execute(statement, params)
            .await
            .map_err(|e| map_db_error("Statement execution failed", e))
    }

    /// Get the connection string (without credentials)
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret().as_str())
    }

    /// Get the pool statistics
    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

/// Build the TLS connector for an `ssl_mode`
///
/// `None` means plain TCP. `prefer` and `allow` try TLS without verifying the
/// server, `require` insists on TLS without verification, `verify-ca` checks
/// the chain only and `verify-full` checks chain and hostname.
fn tls_connector(ssl_mode: &str) -> Result<Option<(SslMode, MakeTlsConnector)>> {
    let (mode, accept_invalid_certs, accept_invalid_hostnames) = match ssl_mode {
        "disable" => return Ok(None),
        "allow" | "prefer" => (SslMode::Prefer, true, true),
        "require" => (SslMode::Require, true, true),
        "verify-ca" => (SslMode::Require, false, true),
        "verify-full" => (SslMode::Require, false, false),
        other => {
            return Err(ExamSyncError::Configuration(format!(
                "Unsupported postgresql.ssl_mode '{other}'"
            )))
        }
    };

    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(accept_invalid_certs)
        .danger_accept_invalid_hostnames(accept_invalid_hostnames)
        .build()
        .map_err(|e| ExamSyncError::Configuration(format!("Failed to build TLS connector: {e}")))?;

    Ok(Some((mode, MakeTlsConnector::new(connector))))
}

/// Translate a driver error, keeping unique violations distinguishable
pub(crate) fn map_db_error(context: &str, error: tokio_postgres::Error) -> ExamSyncError {
    if error.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        let detail = error
            .as_db_error()
            .and_then(|db| db.constraint().map(str::to_string))
            .unwrap_or_else(|| error.to_string());
        return StoreError::UniqueViolation(detail).into();
    }
    StoreError::QueryFailed(format!("{context}: {error}")).into()
}

pub(crate) fn redact_connection_string(connection_string: &str) -> String {
    connection_string
        .rsplit('@')
        .next()
        .filter(|rest| *rest != connection_string)
        .map(|rest| format!("postgresql://***@{rest}"))
        .unwrap_or_else(|| "postgresql://***".to_string())
}
