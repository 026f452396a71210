//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the examsync configuration file.

use super::load_app_config;
use crate::adapters::postgresql::client::redact_connection_string;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating configuration: {config_path}");
        println!();

        // Loading validates; a missing file falls back to the environment
        let config = match load_app_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Provider: {}", config.provider.base_url);
        println!("  Partner: {}", config.provider.partner_id);
        println!("  Source: {}", config.provider.source);
        println!("  Page Size: {}", config.provider.page_size);
        println!(
            "  Session Renewal: after {} days",
            config.provider.session_renewal_days
        );
        println!("  Max Retries: {}", config.provider.retry.max_retries);
        println!(
            "  PostgreSQL: {}",
            redact_connection_string(config.postgresql.connection_string.expose_secret().as_str())
        );
        println!("  SSL Mode: {}", config.postgresql.ssl_mode);
        println!("  Max Connections: {}", config.postgresql.max_connections);
        println!(
            "  Alerts: {}",
            if config.alerts.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!();
        Ok(0)
    }
}
