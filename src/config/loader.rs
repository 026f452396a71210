//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{
    default_connect_timeout_seconds, default_page_size, default_pg_connection_timeout_seconds,
    default_pg_max_connections, default_pg_ssl_mode, default_pg_statement_timeout_seconds,
    default_provider_base_url, default_session_renewal_days, default_timeout_seconds,
    default_token_header, AlertsConfig, AppConfig, ApplicationConfig, LoggingConfig,
    PostgreSQLConfig, ProviderConfig, RetryConfig,
};
use super::secret_string;
use crate::domain::errors::ExamSyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Variables that must be present when configuring from the environment alone
pub const REQUIRED_ENV_VARS: [&str; 5] = [
    "EXAMSYNC_PROVIDER_USERNAME",
    "EXAMSYNC_PROVIDER_PASSWORD",
    "EXAMSYNC_PROVIDER_SOURCE",
    "EXAMSYNC_PROVIDER_PARTNER_ID",
    "EXAMSYNC_DATABASE_URL",
];

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into AppConfig
/// 4. Applies environment variable overrides (EXAMSYNC_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`ExamSyncError::Configuration`] if the file is missing or
/// unreadable, a referenced variable is unset, parsing fails or validation
/// fails.
///
/// # Examples
///
/// ```no_run
/// use examsync::config::loader::load_config;
///
/// let config = load_config("examsync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ExamSyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ExamSyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: AppConfig = toml::from_str(&contents)
        .map_err(|e| ExamSyncError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config, env_lookup);

    config.validate().map_err(|e| {
        ExamSyncError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Builds the configuration from `EXAMSYNC_*` environment variables only
///
/// Used when no configuration file exists. Every variable in
/// [`REQUIRED_ENV_VARS`] must be set; optional settings are read through the
/// same overrides as [`load_config`].
pub fn load_config_from_env() -> Result<AppConfig> {
    load_config_from_lookup(env_lookup)
}

pub(crate) fn load_config_from_lookup<F>(lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let missing: Vec<&str> = REQUIRED_ENV_VARS
        .iter()
        .copied()
        .filter(|name| lookup(name).map_or(true, |v| v.trim().is_empty()))
        .collect();

    if !missing.is_empty() {
        return Err(ExamSyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing.join(", ")
        )));
    }

    let required = |name: &str| lookup(name).unwrap_or_default();

    let source = required("EXAMSYNC_PROVIDER_SOURCE")
        .trim()
        .parse::<u32>()
        .map_err(|e| {
            ExamSyncError::Configuration(format!(
                "EXAMSYNC_PROVIDER_SOURCE must be a non-negative integer: {e}"
            ))
        })?;

    let mut config = AppConfig {
        application: ApplicationConfig::default(),
        provider: ProviderConfig {
            base_url: default_provider_base_url(),
            username: required("EXAMSYNC_PROVIDER_USERNAME"),
            password: secret_string(required("EXAMSYNC_PROVIDER_PASSWORD")),
            source,
            partner_id: required("EXAMSYNC_PROVIDER_PARTNER_ID"),
            token_header: default_token_header(),
            page_size: default_page_size(),
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            session_renewal_days: default_session_renewal_days(),
            retry: RetryConfig::default(),
        },
        postgresql: PostgreSQLConfig {
            connection_string: secret_string(required("EXAMSYNC_DATABASE_URL")),
            max_connections: default_pg_max_connections(),
            connection_timeout_seconds: default_pg_connection_timeout_seconds(),
            statement_timeout_seconds: default_pg_statement_timeout_seconds(),
            ssl_mode: default_pg_ssl_mode(),
            apply_schema: false,
        },
        alerts: AlertsConfig::default(),
        logging: LoggingConfig::default(),
    };

    apply_env_overrides(&mut config, &lookup);

    config.validate().map_err(|e| {
        ExamSyncError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ExamSyncError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ExamSyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the EXAMSYNC_* prefix
///
/// Variables follow the pattern `EXAMSYNC_<SECTION>_<KEY>`, for example
/// `EXAMSYNC_PROVIDER_BASE_URL`. Unparseable numeric values are ignored and
/// the file value is kept.
fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Application overrides
    if let Some(val) = lookup("EXAMSYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = lookup("EXAMSYNC_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Provider overrides
    if let Some(val) = lookup("EXAMSYNC_PROVIDER_BASE_URL") {
        config.provider.base_url = val;
    }
    if let Some(val) = lookup("EXAMSYNC_PROVIDER_USERNAME") {
        config.provider.username = val;
    }
    if let Some(val) = lookup("EXAMSYNC_PROVIDER_PASSWORD") {
        config.provider.password = secret_string(val);
    }
    if let Some(val) = lookup("EXAMSYNC_PROVIDER_SOURCE") {
        if let Ok(source) = val.trim().parse() {
            config.provider.source = source;
        }
    }
    if let Some(val) = lookup("EXAMSYNC_PROVIDER_PARTNER_ID") {
        config.provider.partner_id = val;
    }
    if let Some(val) = lookup("EXAMSYNC_PROVIDER_TOKEN_HEADER") {
        config.provider.token_header = val;
    }
    if let Some(val) = lookup("EXAMSYNC_PROVIDER_PAGE_SIZE") {
        if let Ok(size) = val.parse() {
            config.provider.page_size = size;
        }
    }
    if let Some(val) = lookup("EXAMSYNC_PROVIDER_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.provider.timeout_seconds = timeout;
        }
    }
    if let Some(val) = lookup("EXAMSYNC_PROVIDER_RETRY_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.provider.retry.max_retries = retries;
        }
    }
    if let Some(val) = lookup("EXAMSYNC_PROVIDER_RETRY_INITIAL_DELAY_MS") {
        if let Ok(delay) = val.parse() {
            config.provider.retry.initial_delay_ms = delay;
        }
    }

    // PostgreSQL overrides
    if let Some(val) = lookup("EXAMSYNC_DATABASE_URL") {
        config.postgresql.connection_string = secret_string(val);
    }
    if let Some(val) = lookup("EXAMSYNC_POSTGRESQL_MAX_CONNECTIONS") {
        if let Ok(max) = val.parse() {
            config.postgresql.max_connections = max;
        }
    }
    if let Some(val) = lookup("EXAMSYNC_POSTGRESQL_SSL_MODE") {
        config.postgresql.ssl_mode = val;
    }

    // Alert overrides
    if let Some(val) = lookup("EXAMSYNC_ALERTS_ENABLED") {
        config.alerts.enabled = val.parse().unwrap_or(true);
    }

    // Logging overrides
    if let Some(val) = lookup("EXAMSYNC_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Some(val) = lookup("EXAMSYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("EXAMSYNC_TEST_SUBST_VAR", "test_value");
        let input = "password = \"${EXAMSYNC_TEST_SUBST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("EXAMSYNC_TEST_SUBST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let input = "password = \"${EXAMSYNC_TEST_SURELY_UNSET}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("EXAMSYNC_TEST_SURELY_UNSET"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# password = \"${EXAMSYNC_TEST_COMMENTED_OUT}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-examsync.toml");
        assert!(matches!(result, Err(ExamSyncError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[provider]
base_url = "https://api.example.com/v2"
username = "clinic"
password = "secret"
source = 100
partner_id = "P-42"

[provider.retry]
max_retries = 2

[postgresql]
connection_string = "postgresql://u:p@localhost:5432/clinic"

[alerts.thresholds]
lead_no_contact_days = 4
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.provider.partner_id, "P-42");
        assert_eq!(config.provider.token_header, "bx-session-token");
        assert_eq!(config.provider.retry.max_retries, 2);
        assert_eq!(config.provider.page_size, 100);
        assert!(config.alerts.enabled);
        assert_eq!(config.alerts.thresholds.lead_no_contact_days, 4);
        assert_eq!(config.alerts.thresholds.maintenance_upcoming_days, 7);
    }

    #[test]
    fn test_load_from_lookup_requires_all_vars() {
        let lookup = lookup_from(&[
            ("EXAMSYNC_PROVIDER_USERNAME", "clinic"),
            ("EXAMSYNC_PROVIDER_PASSWORD", "secret"),
        ]);
        let err = load_config_from_lookup(lookup).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("EXAMSYNC_PROVIDER_SOURCE"));
        assert!(message.contains("EXAMSYNC_PROVIDER_PARTNER_ID"));
        assert!(message.contains("EXAMSYNC_DATABASE_URL"));
        assert!(!message.contains("EXAMSYNC_PROVIDER_USERNAME"));
    }

    #[test]
    fn test_load_from_lookup_builds_config() {
        let lookup = lookup_from(&[
            ("EXAMSYNC_PROVIDER_USERNAME", "clinic"),
            ("EXAMSYNC_PROVIDER_PASSWORD", "secret"),
            ("EXAMSYNC_PROVIDER_SOURCE", "100"),
            ("EXAMSYNC_PROVIDER_PARTNER_ID", "P-1"),
            ("EXAMSYNC_DATABASE_URL", "postgres://u:p@db:5432/clinic"),
            ("EXAMSYNC_PROVIDER_PAGE_SIZE", "50"),
        ]);
        let config = load_config_from_lookup(lookup).unwrap();
        assert_eq!(config.provider.source, 100);
        assert_eq!(config.provider.page_size, 50);
        assert_eq!(
            config.postgresql.connection_string.expose_secret().as_str(),
            "postgres://u:p@db:5432/clinic"
        );
    }

    #[test]
    fn test_load_from_lookup_rejects_bad_source() {
        let lookup = lookup_from(&[
            ("EXAMSYNC_PROVIDER_USERNAME", "clinic"),
            ("EXAMSYNC_PROVIDER_PASSWORD", "secret"),
            ("EXAMSYNC_PROVIDER_SOURCE", "web"),
            ("EXAMSYNC_PROVIDER_PARTNER_ID", "P-1"),
            ("EXAMSYNC_DATABASE_URL", "postgres://u:p@db:5432/clinic"),
        ]);
        assert!(load_config_from_lookup(lookup).is_err());
    }
}
