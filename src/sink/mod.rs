//! Warehouse sink abstraction.
//!
//! A [`Sink`] stores event rows. The schema lives here as data so that
//! DDL generation and row shape stay in one place; sinks only execute
//! what this module describes.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};

pub mod postgres;

pub use postgres::PostgresSink;

/// Sparse event row: serialized event with `None` fields absent.
pub type Row = serde_json::Map<String, Value>;

/// A row the sink rejected. Delivered to the caller for logging, never
/// retried: a row the database refuses once will be refused again.
#[derive(Debug, Clone)]
pub struct InsertError {
    pub row: usize,
    pub message: String,
}

impl std::fmt::Display for InsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Timestamp,
    Json,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Text => "TEXT",
            ColumnKind::Integer => "BIGINT",
            ColumnKind::Float => "DOUBLE PRECISION",
            ColumnKind::Timestamp => "TIMESTAMPTZ",
            ColumnKind::Json => "JSONB",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind, required: false }
}

const fn req(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind, required: true }
}

/// Event table schema. Column order is the row serialization order.
pub const SCHEMA: &[Column] = &[
    req("event_id", ColumnKind::Text),
    req("event_type", ColumnKind::Text),
    req("timestamp", ColumnKind::Timestamp),
    col("app_name", ColumnKind::Text),
    col("merchant_host", ColumnKind::Text),
    col("platform_profile_url", ColumnKind::Text),
    col("transport", ColumnKind::Text),
    col("http_method", ColumnKind::Text),
    col("http_path", ColumnKind::Text),
    col("http_status_code", ColumnKind::Integer),
    col("idempotency_key", ColumnKind::Text),
    col("request_id", ColumnKind::Text),
    col("checkout_session_id", ColumnKind::Text),
    col("checkout_status", ColumnKind::Text),
    col("order_id", ColumnKind::Text),
    col("currency", ColumnKind::Text),
    col("items_discount_amount", ColumnKind::Integer),
    col("subtotal_amount", ColumnKind::Integer),
    col("discount_amount", ColumnKind::Integer),
    col("fulfillment_amount", ColumnKind::Integer),
    col("tax_amount", ColumnKind::Integer),
    col("fee_amount", ColumnKind::Integer),
    col("total_amount", ColumnKind::Integer),
    col("line_items_json", ColumnKind::Json),
    col("line_item_count", ColumnKind::Integer),
    col("payment_handler_id", ColumnKind::Text),
    col("payment_instrument_type", ColumnKind::Text),
    col("payment_brand", ColumnKind::Text),
    col("ucp_version", ColumnKind::Text),
    col("capabilities_json", ColumnKind::Json),
    col("extensions_json", ColumnKind::Json),
    col("identity_provider", ColumnKind::Text),
    col("identity_scope", ColumnKind::Text),
    col("fulfillment_type", ColumnKind::Text),
    col("fulfillment_destination_country", ColumnKind::Text),
    col("discount_codes_json", ColumnKind::Json),
    col("discount_applied_json", ColumnKind::Json),
    col("expires_at", ColumnKind::Timestamp),
    col("continue_url", ColumnKind::Text),
    col("permalink_url", ColumnKind::Text),
    col("error_code", ColumnKind::Text),
    col("error_message", ColumnKind::Text),
    col("error_severity", ColumnKind::Text),
    col("messages_json", ColumnKind::Json),
    col("latency_ms", ColumnKind::Float),
    col("custom_metadata_json", ColumnKind::Json),
];

/// Build idempotent DDL for the event table and its query indexes.
pub fn ddl(table: &str, schema: &[Column]) -> String {
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {table} (\n");
    for (i, column) in schema.iter().enumerate() {
        let not_null = if column.required { " NOT NULL" } else { "" };
        let comma = if i + 1 < schema.len() { "," } else { "" };
        sql.push_str(&format!(
            "    {} {}{not_null}{comma}\n",
            column.name,
            column.kind.sql_type()
        ));
    }
    sql.push_str(");\n");

    // Index names cannot be schema-qualified.
    let base = table.replace('.', "_");
    for column in ["event_type", "checkout_session_id", "timestamp"] {
        sql.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{base}_{column} ON {table} ({column});\n"
        ));
    }
    sql
}

/// Validate a table name before interpolating it into SQL. Accepts an
/// identifier or a schema-qualified pair of identifiers.
pub fn validate_table_name(table: &str) -> Result<()> {
    let parts: Vec<&str> = table.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|p| {
            !p.is_empty()
                && p.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && p.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(Error::Config(format!("invalid table name: {table:?}")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

/// Destination for event rows.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Create the event table and indexes if they do not exist.
    async fn ensure_table(&self, table: &str, schema: &[Column]) -> Result<()>;

    /// Insert a batch of rows. Per-row rejections are returned in-band;
    /// an `Err` means the whole batch failed and may be retried.
    async fn insert(&self, table: &str, rows: &[Row]) -> Result<Vec<InsertError>>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
