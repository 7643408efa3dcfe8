//! Postgres sink.
//!
//! Rows are sparse JSON objects, so inserts go through
//! `jsonb_populate_record`: columns absent from a row land as NULL and
//! the table schema stays the single source of truth for types.

use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use super::{Column, InsertError, Row, Sink, ddl, validate_table_name};
use crate::error::Result;

pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    /// Connect with a bounded pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sink for PostgresSink {
    async fn ensure_table(&self, table: &str, schema: &[Column]) -> Result<()> {
        validate_table_name(table)?;
        sqlx::raw_sql(&ddl(table, schema)).execute(&self.pool).await?;
        info!(table, "event table ready");
        Ok(())
    }

    async fn insert(&self, table: &str, rows: &[Row]) -> Result<Vec<InsertError>> {
        validate_table_name(table)?;
        let sql =
            format!("INSERT INTO {table} SELECT * FROM jsonb_populate_record(NULL::{table}, $1)");
        let mut rejected = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let result = sqlx::query(&sql)
                .bind(Value::Object(row.clone()))
                .execute(&self.pool)
                .await;
            match result {
                Ok(_) => {}
                // A database rejection (constraint, type mismatch) is
                // specific to this row; the rest of the batch proceeds.
                Err(sqlx::Error::Database(db)) => rejected.push(InsertError {
                    row: i,
                    message: db.to_string(),
                }),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(rejected)
    }
}
