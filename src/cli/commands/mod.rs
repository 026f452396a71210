//! CLI command implementations
//!
//! Commands return the process exit code: 0 success, 1 completed with record
//! errors, 2 configuration error, 4 connection failure, 5 fatal failure.

pub mod alerts;
pub mod init;
pub mod sync;
pub mod validate;

use crate::config::{load_config, load_config_from_env, AppConfig};
use crate::domain::Result;
use std::path::Path;

/// Load the configuration file, or the environment when the file is absent
pub(crate) fn load_app_config(config_path: &str) -> Result<AppConfig> {
    if Path::new(config_path).exists() {
        load_config(config_path)
    } else {
        tracing::info!(
            config_path = %config_path,
            "Configuration file not found, reading EXAMSYNC_* environment variables"
        );
        load_config_from_env()
    }
}
