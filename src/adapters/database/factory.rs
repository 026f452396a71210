//! Storage factory
//!
//! Builds the store pair used by the CLI from configuration.

use crate::adapters::database::traits::{AlertStore, ClinicStore};
use crate::adapters::memory::InMemoryStore;
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::PostgreSQLConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Clinic and alert stores backed by the same connection pool
#[derive(Clone)]
pub struct Stores {
    pub clinic: Arc<dyn ClinicStore>,
    pub alerts: Arc<dyn AlertStore>,
}

/// Create PostgreSQL-backed stores
///
/// Applies the bundled schema first when `apply_schema` is set.
///
/// # Errors
///
/// Returns an error if the pool cannot be created or the schema fails to apply.
pub async fn create_stores(config: &PostgreSQLConfig) -> Result<Stores> {
    tracing::info!("Creating PostgreSQL stores");
    let client = PostgreSQLClient::new(config.clone()).await?;
    if config.apply_schema {
        client.apply_schema().await?;
    }
    let adapter = Arc::new(PostgreSQLAdapter::new(client));

    Ok(Stores {
        clinic: adapter.clone(),
        alerts: adapter,
    })
}

/// Create volatile stores for dry runs
pub fn create_in_memory_stores() -> Stores {
    tracing::info!("Creating in-memory stores (dry run)");
    let store = Arc::new(InMemoryStore::new());
    Stores {
        clinic: store.clone(),
        alerts: store,
    }
}
