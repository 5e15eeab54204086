//! SQLite implementation of the BookkeepingStore.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::adapters::sqlite::{bind_markers, MAX_BINDS_PER_STATEMENT};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::RepoId;
use crate::domain::ports::BookkeepingStore;

#[derive(Clone)]
pub struct SqliteBookkeepingStore {
    pool: SqlitePool,
}

impl SqliteBookkeepingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookkeepingStore for SqliteBookkeepingStore {
    async fn is_cached(&self, query_name: &str, repo_id: RepoId) -> DomainResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM cache_bookkeeping WHERE query_name = ? AND repo_id = ?)",
        )
        .bind(query_name)
        .bind(repo_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn uncached(&self, query_name: &str, repo_ids: &[RepoId]) -> DomainResult<Vec<RepoId>> {
        if repo_ids.is_empty() {
            return Ok(Vec::new());
        }

        // One batched existence query per chunk, never one per repo. Repo
        // lists run into the low thousands, so this is the hot path.
        let mut found: HashSet<RepoId> = HashSet::new();
        for chunk in repo_ids.chunks(MAX_BINDS_PER_STATEMENT) {
            let sql = format!(
                "SELECT DISTINCT repo_id FROM cache_bookkeeping
                 WHERE query_name = ? AND repo_id IN ({})",
                bind_markers(chunk.len())
            );
            let mut query = sqlx::query_as::<_, (RepoId,)>(&sql).bind(query_name);
            for id in chunk {
                query = query.bind(id);
            }
            let rows = query.fetch_all(&self.pool).await?;
            found.extend(rows.into_iter().map(|(id,)| id));
        }

        let mut seen = HashSet::new();
        Ok(repo_ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id) && seen.insert(*id))
            .collect())
    }

    async fn record_cached(&self, query_name: &str, repo_ids: &[RepoId]) -> DomainResult<()> {
        if repo_ids.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let rows_per_stmt = MAX_BINDS_PER_STATEMENT / 3;
        for chunk in repo_ids.chunks(rows_per_stmt) {
            let tuples = vec!["(?, ?, ?)"; chunk.len()].join(", ");
            let sql = format!(
                "INSERT INTO cache_bookkeeping (query_name, repo_id, cached_at) VALUES {tuples}"
            );
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(query_name).bind(id).bind(&now);
            }
            query.execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn freshness(&self, query_name: &str) -> DomainResult<Vec<(RepoId, DateTime<Utc>)>> {
        let rows: Vec<(RepoId, String)> = sqlx::query_as(
            "SELECT repo_id, MAX(cached_at) FROM cache_bookkeeping
             WHERE query_name = ? GROUP BY repo_id ORDER BY repo_id",
        )
        .bind(query_name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, ts)| {
                DateTime::parse_from_rfc3339(&ts)
                    .map(|dt| (id, dt.with_timezone(&Utc)))
                    .map_err(|e| DomainError::SerializationError(e.to_string()))
            })
            .collect()
    }
}
