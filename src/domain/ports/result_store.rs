use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{QueryDef, RepoId, ResultSet};

/// Port for per-query result tables in the cache store.
///
/// Exclusively written by the cache coordinator; read by the retrieval
/// service. Writes must be conflict-tolerant so retried and concurrent fill
/// jobs are safe to re-run.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Create the query's result table if it does not exist yet.
    async fn ensure_table(&self, query: &QueryDef) -> DomainResult<()>;

    /// Append a batch of rows, ignoring rows whose unique key already
    /// exists. Returns the number of rows actually inserted.
    async fn write_batch(&self, query_name: &str, batch: &ResultSet) -> DomainResult<u64>;

    /// All rows whose repo_id is in the given set, as a unioned table.
    async fn read(&self, query_name: &str, repo_ids: &[RepoId]) -> DomainResult<ResultSet>;
}
