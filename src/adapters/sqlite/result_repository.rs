//! SQLite implementation of the ResultStore: one table per registered query.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::adapters::sqlite::{
    bind_cell, bind_markers, column_names, decode_row, table_columns, MAX_BINDS_PER_STATEMENT,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::query::is_valid_identifier;
use crate::domain::models::{QueryDef, RepoId, ResultSet};
use crate::domain::ports::ResultStore;

#[derive(Clone)]
pub struct SqliteResultStore {
    pool: SqlitePool,
}

impl SqliteResultStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn checked_identifier(name: &str) -> DomainResult<&str> {
    if is_valid_identifier(name) {
        Ok(name)
    } else {
        Err(DomainError::InvalidIdentifier(name.to_string()))
    }
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn ensure_table(&self, query: &QueryDef) -> DomainResult<()> {
        query.validate()?;

        let column_defs = query
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.sql_type))
            .collect::<Vec<_>>()
            .join(", ");
        // The UNIQUE constraint is what makes INSERT OR IGNORE a no-op for
        // re-run and concurrent fills.
        let unique = query.unique_columns().join(", ");
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} ({column_defs}, UNIQUE ({unique}))",
            query.name
        );
        sqlx::query(&ddl).execute(&self.pool).await?;

        let index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_repo_id ON {0} (repo_id)",
            query.name
        );
        sqlx::query(&index).execute(&self.pool).await?;
        Ok(())
    }

    async fn write_batch(&self, query_name: &str, batch: &ResultSet) -> DomainResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        let table = checked_identifier(query_name)?;
        for col in &batch.columns {
            checked_identifier(col)?;
        }

        let column_list = batch.columns.join(", ");
        let tuple = format!("({})", bind_markers(batch.columns.len()));
        let rows_per_stmt = (MAX_BINDS_PER_STATEMENT / batch.columns.len()).max(1);

        let mut inserted = 0u64;
        for chunk in batch.rows.chunks(rows_per_stmt) {
            let tuples = vec![tuple.as_str(); chunk.len()].join(", ");
            let sql =
                format!("INSERT OR IGNORE INTO {table} ({column_list}) VALUES {tuples}");
            let mut query = sqlx::query(&sql);
            for row in chunk {
                for cell in row {
                    query = bind_cell(query, cell);
                }
            }
            inserted += query.execute(&self.pool).await?.rows_affected();
        }
        Ok(inserted)
    }

    async fn read(&self, query_name: &str, repo_ids: &[RepoId]) -> DomainResult<ResultSet> {
        let table = checked_identifier(query_name)?;
        let columns = table_columns(&self.pool, table).await?;
        if columns.is_empty() {
            return Err(DomainError::DatabaseError(format!(
                "result table '{table}' does not exist"
            )));
        }

        let mut result = ResultSet::new(columns);
        if repo_ids.is_empty() {
            return Ok(result);
        }

        for chunk in repo_ids.chunks(MAX_BINDS_PER_STATEMENT) {
            let sql = format!(
                "SELECT * FROM {table} WHERE repo_id IN ({})",
                bind_markers(chunk.len())
            );
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            let rows = query.fetch_all(&self.pool).await?;
            for row in &rows {
                debug_assert_eq!(column_names(row), result.columns);
                result.push_row(decode_row(row)?)?;
            }
        }
        Ok(result)
    }
}
