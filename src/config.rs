//! Typed configuration.
//!
//! `Config` loads once from environment variables and fails fast if
//! required vars are missing; the database URL is wrapped in
//! secrecy::SecretString to prevent log leaks. `TrackerConfig` is the
//! construction-time option surface of the [`crate::tracker::Tracker`].

use crate::error::{Error, Result};
use secrecy::SecretString;
use std::collections::HashSet;

/// Field names redacted by default when PII redaction is enabled.
pub const DEFAULT_PII_FIELDS: &[&str] = &[
    "email",
    "phone",
    "phone_number",
    "first_name",
    "last_name",
    "street_address",
    "postal_code",
];

/// Environment-derived configuration for the CLI and sink setup.
#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub table: String,
    pub app_name: String,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            table: std::env::var("UCP_ANALYTICS_TABLE").unwrap_or_else(|_| "ucp_events".to_string()),
            app_name: std::env::var("APP_NAME").unwrap_or_default(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

// ---------------------------------------------------------------------------
// Tracker options
// ---------------------------------------------------------------------------

/// Options accepted by [`crate::tracker::Tracker::new`].
///
/// Defaults match the fire-and-forget contract: batches of 50 rows,
/// a 10 000 row buffer bound, table auto-creation on, redaction off.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub app_name: String,
    pub table: String,
    pub batch_size: usize,
    pub max_buffer_size: usize,
    pub auto_create_table: bool,
    pub redact_pii: bool,
    pub pii_fields: HashSet<String>,
    pub custom_metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            table: "ucp_events".to_string(),
            batch_size: 50,
            max_buffer_size: 10_000,
            auto_create_table: true,
            redact_pii: false,
            pii_fields: DEFAULT_PII_FIELDS.iter().map(|s| s.to_string()).collect(),
            custom_metadata: None,
        }
    }
}

impl TrackerConfig {
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn max_buffer_size(mut self, n: usize) -> Self {
        self.max_buffer_size = n;
        self
    }

    pub fn auto_create_table(mut self, enabled: bool) -> Self {
        self.auto_create_table = enabled;
        self
    }

    pub fn redact_pii(mut self, enabled: bool) -> Self {
        self.redact_pii = enabled;
        self
    }

    /// Replace the PII field denylist. Names are matched case-insensitively.
    pub fn pii_fields(mut self, fields: impl IntoIterator<Item = String>) -> Self {
        self.pii_fields = fields.into_iter().collect();
        self
    }

    /// Static metadata serialized onto every record as `custom_metadata_json`.
    pub fn custom_metadata(
        mut self,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.custom_metadata = Some(metadata);
        self
    }
}
