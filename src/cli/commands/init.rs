//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "examsync.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, Self::sample_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your partner id and source", self.output);
                println!("  2. Set BIOLOGIX_USERNAME, BIOLOGIX_PASSWORD and DATABASE_URL");
                println!("     (a .env file in the working directory is read at startup)");
                println!("  3. Validate configuration: examsync validate-config");
                println!("  4. Try a run without database writes: examsync sync --dry-run");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    fn sample_config() -> &'static str {
        r#"# examsync configuration
# Biologix exam sync and clinic alerts

[application]
# trace | debug | info | warn | error
log_level = "info"
# Sync into memory only, no database writes, no alerts
dry_run = false

[provider]
base_url = "https://api.biologixsleep.com/v2"
username = "${BIOLOGIX_USERNAME}"
password = "${BIOLOGIX_PASSWORD}"
# Numeric source id assigned by Biologix
source = 100
partner_id = "YOUR-PARTNER-ID"
# Response header carrying the session token
token_header = "bx-session-token"
page_size = 100
timeout_seconds = 60
connect_timeout_seconds = 30
# Tokens live 7 days; renew before that
session_renewal_days = 6

[provider.retry]
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

[postgresql]
connection_string = "${DATABASE_URL}"
max_connections = 10
connection_timeout_seconds = 30
statement_timeout_seconds = 60
# disable | allow | prefer | require | verify-ca | verify-full
ssl_mode = "prefer"
# Create missing tables on startup
apply_schema = false

[alerts]
enabled = true

[alerts.thresholds]
maintenance_upcoming_days = 7
maintenance_overdue_days = 30
finalized_followup_months = 6
lead_no_contact_days = 3
active_no_session_days = 7
non_responder_min_sessions = 5
non_responder_min_exams = 2
non_responder_improvement_pct = 20.0
critical_exam_lookback_days = 7

[logging]
local_enabled = false
local_path = "/var/log/examsync"
# daily | hourly | never
local_rotation = "daily"
"#
    }
}
