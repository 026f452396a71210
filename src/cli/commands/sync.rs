//! Sync command implementation
//!
//! This module implements the `sync` command: one provider-to-database run
//! followed by an alert evaluation pass. Progress goes to the log on stderr;
//! stdout only carries the [`RunOutput`] JSON document.

use super::load_app_config;
use crate::adapters::biologix::{BiologixClient, ExamProvider, SessionManager};
use crate::adapters::database::{create_in_memory_stores, create_stores, Stores};
use crate::config::AppConfig;
use crate::core::alerts::AlertRuleEngine;
use crate::core::retry::RetryPolicy;
use crate::core::sync::{ExternalRecordFetcher, RunOutput, SyncOrchestrator, UpsertEngine};
use chrono::Utc;
use clap::Args;
use std::sync::Arc;

/// Arguments for the sync command
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Sync into a volatile in-memory store and skip alert evaluation
    #[arg(long)]
    pub dry_run: bool,

    /// Skip alert evaluation after the sync
    #[arg(long)]
    pub skip_alerts: bool,

    /// Override provider.page_size
    #[arg(long)]
    pub page_size: Option<u32>,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting sync");

        let mut config = match load_app_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                emit(&RunOutput::failure(&e, Utc::now()))?;
                return Ok(2);
            }
        };

        if let Some(page_size) = self.page_size {
            config.provider.page_size = page_size;
            if let Err(e) = config.validate() {
                eprintln!("Configuration validation failed: {e}");
                emit(&RunOutput::failure(format!("Configuration error: {e}"), Utc::now()))?;
                return Ok(2);
            }
        }

        let dry_run = self.dry_run || config.application.dry_run;
        if dry_run {
            eprintln!("DRY RUN MODE - records are synced into memory only");
        }

        let provider: Arc<dyn ExamProvider> = match BiologixClient::new(&config.provider) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                eprintln!("Failed to create provider client: {e}");
                emit(&RunOutput::failure(&e, Utc::now()))?;
                return Ok(2);
            }
        };

        let stores = match open_stores(&config, dry_run).await {
            Ok(stores) => stores,
            Err(e) => {
                eprintln!("Failed to connect to the database: {e}");
                emit(&RunOutput::failure(&e, Utc::now()))?;
                return Ok(4);
            }
        };

        let orchestrator = build_orchestrator(&config, provider, &stores);
        let summary = match orchestrator.run().await {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("Sync failed: {e}");
                emit(&RunOutput::failure(&e, Utc::now()))?;
                return Ok(5);
            }
        };

        let alerts = if self.skip_alerts || dry_run || !config.alerts.enabled {
            tracing::info!("Alert evaluation skipped");
            None
        } else {
            let engine = AlertRuleEngine::new(
                stores.clinic.clone(),
                stores.alerts.clone(),
                config.alerts.thresholds.clone(),
            );
            Some(engine.evaluate().await)
        };

        emit(&RunOutput::success(&summary, alerts, Utc::now()))?;

        if summary.has_errors() {
            Ok(1)
        } else {
            Ok(0)
        }
    }
}

async fn open_stores(config: &AppConfig, dry_run: bool) -> crate::domain::Result<Stores> {
    if dry_run {
        return Ok(create_in_memory_stores());
    }
    let stores = create_stores(&config.postgresql).await?;
    stores.clinic.test_connection().await?;
    Ok(stores)
}

fn build_orchestrator(
    config: &AppConfig,
    provider: Arc<dyn ExamProvider>,
    stores: &Stores,
) -> SyncOrchestrator {
    let retry = RetryPolicy::from_config(&config.provider.retry);
    let sessions = Arc::new(SessionManager::new(
        provider.clone(),
        config.provider.session_renewal_days,
    ));
    let fetcher = ExternalRecordFetcher::new(
        provider,
        sessions.clone(),
        retry.clone(),
        u64::from(config.provider.page_size),
    );
    SyncOrchestrator::new(
        sessions,
        fetcher,
        UpsertEngine::new(stores.clinic.clone()),
        retry,
    )
}

fn emit(output: &RunOutput) -> anyhow::Result<()> {
    println!("{}", output.to_json()?);
    Ok(())
}
