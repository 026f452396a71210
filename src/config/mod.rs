//! Configuration management for examsync.
//!
//! TOML configuration with:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `EXAMSYNC_*` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! When no file exists the CLI builds the configuration from the environment
//! alone with [`load_config_from_env`].
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [provider]
//! base_url = "https://api.biologixsleep.com/v2"
//! username = "clinic-integration"
//! password = "${BIOLOGIX_PASSWORD}"
//! source = 100
//! partner_id = "PARTNER-ID"
//!
//! [provider.retry]
//! max_retries = 3
//! initial_delay_ms = 1000
//!
//! [postgresql]
//! connection_string = "${DATABASE_URL}"
//!
//! [alerts]
//! enabled = true
//!
//! [alerts.thresholds]
//! lead_no_contact_days = 3
//! ```
//!
//! # Validation
//!
//! ```rust,no_run
//! use examsync::config::load_config;
//!
//! match load_config("examsync.toml") {
//!     Ok(config) => println!("Partner: {}", config.provider.partner_id),
//!     Err(e) => eprintln!("Configuration error: {e}"),
//! }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_config_from_env, REQUIRED_ENV_VARS};
pub use schema::{
    AlertsConfig, AppConfig, ApplicationConfig, LoggingConfig, PostgreSQLConfig, ProviderConfig,
    RetryConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
