//! Alerts command implementation
//!
//! Operator access to the alert table: run the rules on demand, list alerts
//! and close them.

use super::load_app_config;
use crate::adapters::database::{create_stores, Stores};
use crate::core::alerts::{AlertRuleEngine, AlertThresholds};
use crate::domain::{Alert, AlertId, AlertStatus, ExamSyncError, StoreError};
use clap::{Args, Subcommand};

/// Arguments for the alerts command
#[derive(Args, Debug)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Subcommand, Debug)]
pub enum AlertsCommand {
    /// Run the alert rules once without syncing
    Evaluate,

    /// List alerts, newest first
    List {
        /// Only alerts with this status (pending, resolved, ignored)
        #[arg(long)]
        status: Option<String>,
    },

    /// Close an alert
    Resolve {
        /// Alert id
        id: String,

        /// Mark the alert as ignored instead of resolved
        #[arg(long)]
        ignore: bool,

        /// Operator closing the alert
        #[arg(long)]
        by: Option<String>,
    },
}

impl AlertsArgs {
    /// Execute the alerts command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_app_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let stores = match create_stores(&config.postgresql).await {
            Ok(stores) => stores,
            Err(e) => {
                eprintln!("Failed to connect to the database: {e}");
                return Ok(4);
            }
        };

        self.run(&stores, &config.alerts.thresholds).await
    }

    /// Run the subcommand against already opened stores
    pub async fn run(&self, stores: &Stores, thresholds: &AlertThresholds) -> anyhow::Result<i32> {
        match &self.command {
            AlertsCommand::Evaluate => {
                let engine = AlertRuleEngine::new(
                    stores.clinic.clone(),
                    stores.alerts.clone(),
                    thresholds.clone(),
                );
                let summary = engine.evaluate().await;
                println!("{}", serde_json::to_string_pretty(&summary)?);
                Ok(if summary.has_failures() { 1 } else { 0 })
            }
            AlertsCommand::List { status } => {
                let status = match status.as_deref().map(str::parse::<AlertStatus>).transpose() {
                    Ok(status) => status,
                    Err(e) => {
                        eprintln!("{e}");
                        return Ok(2);
                    }
                };

                match stores.alerts.list_alerts(status).await {
                    Ok(alerts) => {
                        if alerts.is_empty() {
                            println!("No alerts");
                        }
                        for alert in &alerts {
                            println!("{}", format_alert_row(alert));
                        }
                        Ok(0)
                    }
                    Err(e) => {
                        eprintln!("Failed to list alerts: {e}");
                        Ok(5)
                    }
                }
            }
            AlertsCommand::Resolve { id, ignore, by } => {
                let id: AlertId = match id.parse() {
                    Ok(id) => id,
                    Err(e) => {
                        eprintln!("{e}");
                        return Ok(2);
                    }
                };
                let status = if *ignore {
                    AlertStatus::Ignored
                } else {
                    AlertStatus::Resolved
                };

                match stores.alerts.set_alert_status(id, status, by.as_deref()).await {
                    Ok(alert) => {
                        tracing::info!(alert_id = %alert.id, status = %alert.status, "Alert closed");
                        println!("Alert {} marked {}", alert.id, alert.status);
                        Ok(0)
                    }
                    Err(ExamSyncError::Store(StoreError::NotFound(what))) => {
                        eprintln!("No such alert: {what}");
                        Ok(1)
                    }
                    Err(ExamSyncError::Validation(reason)) => {
                        eprintln!("Alert not updated: {reason}");
                        Ok(1)
                    }
                    Err(e) => {
                        eprintln!("Failed to update alert: {e}");
                        Ok(5)
                    }
                }
            }
        }
    }
}

fn format_alert_row(alert: &Alert) -> String {
    format!(
        "{}  {:<11} {:<6} {:<8} {}  {}",
        alert.id,
        alert.alert_type.as_str(),
        alert.urgency.as_str(),
        alert.status.as_str(),
        alert.created_at.format("%Y-%m-%d %H:%M"),
        alert.title
    )
}
