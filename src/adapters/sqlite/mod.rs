//! SQLite adapters for the cache store and the primary analytical source.

pub mod bookkeeping_repository;
pub mod connection;
pub mod migrations;
pub mod result_repository;
pub mod source_reader;

pub use bookkeeping_repository::SqliteBookkeepingStore;
pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError};
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use result_repository::SqliteResultStore;
pub use source_reader::SqliteSourceReader;

use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::DatabaseConfig;

#[derive(Debug, thiserror::Error)]
pub enum StoreInitError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
}

/// Open the cache store and bring its schema up to date.
pub async fn initialize_cache_store(config: &DatabaseConfig) -> Result<SqlitePool, StoreInitError> {
    let pool = create_pool(config).await?;
    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await?;
    Ok(pool)
}

/// In-memory cache store with all migrations applied, for tests.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, StoreInitError> {
    let pool = create_test_pool().await?;
    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await?;
    Ok(pool)
}

/// Bind markers per statement are kept conservative; older SQLite builds cap
/// host parameters at 999.
pub(crate) const MAX_BINDS_PER_STATEMENT: usize = 900;

/// `?, ?, ...` for an IN-list or VALUES tuple of `n` binds.
pub(crate) fn bind_markers(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Column names of a row, in select order.
pub(crate) fn column_names(row: &SqliteRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Decode every cell of a row into a dynamically typed value.
///
/// SQLite is dynamically typed per value, so the decode branches on the
/// stored value's type, not the declared column type.
pub(crate) fn decode_row(row: &SqliteRow) -> DomainResult<Vec<Value>> {
    (0..row.len()).map(|idx| decode_cell(row, idx)).collect()
}

fn decode_cell(row: &SqliteRow, idx: usize) -> DomainResult<Value> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Ok(Value::from(row.try_get::<i64, _>(idx)?)),
        "REAL" => Ok(serde_json::Number::from_f64(row.try_get::<f64, _>(idx)?)
            .map_or(Value::Null, Value::Number)),
        // Binary cells are base64-encoded so they survive the text round
        // trip through the cache store without loss.
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get(idx)?;
            Ok(Value::String(general_purpose::STANDARD.encode(bytes)))
        }
        _ => Ok(Value::String(row.try_get::<String, _>(idx)?)),
    }
}

/// Bind a dynamically typed cell onto a query.
pub(crate) fn bind_cell<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    cell: &'q Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match cell {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => query.bind(s.as_str()),
        // Arrays/objects are stored as their JSON text
        other => query.bind(other.to_string()),
    }
}

/// Column names of a cache-store table, in table order, via PRAGMA.
/// Works on empty tables, where a SELECT yields no row metadata.
pub(crate) async fn table_columns(pool: &SqlitePool, table: &str) -> DomainResult<Vec<String>> {
    if !crate::domain::models::query::is_valid_identifier(table) {
        return Err(DomainError::InvalidIdentifier(table.to_string()));
    }
    let rows: Vec<(i64, String)> =
        sqlx::query_as(&format!("SELECT cid, name FROM pragma_table_info('{table}')"))
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(_, name)| name).collect())
}
