use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{QueryDef, RepoId, ResultSet};

/// Port for reads against the primary analytical source.
///
/// Implementations own their connection pool; it is never shared with the
/// cache store's write connection.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Execute the query's SQL parameterized by `repo_ids` exactly once and
    /// return a cursor over its rows. The single execution is what keeps a
    /// fill consistent: every page comes from the same result set, so rows
    /// cannot shift across page boundaries while the source is mutated.
    async fn fetch(
        &self,
        query: &QueryDef,
        repo_ids: &[RepoId],
    ) -> DomainResult<Box<dyn SourceCursor>>;
}

/// Incremental reader over one source query execution.
#[async_trait]
pub trait SourceCursor: Send {
    /// Next page of up to `limit` rows; `None` once the result set is
    /// exhausted. Errors from the underlying read propagate untouched.
    async fn next_page(&mut self, limit: i64) -> DomainResult<Option<ResultSet>>;
}
