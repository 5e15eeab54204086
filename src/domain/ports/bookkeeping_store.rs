use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::RepoId;

/// Port for the bookkeeping table: the single source of truth for "is this
/// repo's data for this query present".
///
/// A row (query_name, repo_id) asserts the result table holds the complete,
/// possibly empty, answer for that repo. Implementations must fail loudly on
/// connectivity errors: silently answering "all uncached" causes re-fetch
/// storms, "all cached" causes permanently missing data.
#[async_trait]
pub trait BookkeepingStore: Send + Sync {
    /// True iff a bookkeeping row exists for the pair.
    async fn is_cached(&self, query_name: &str, repo_id: RepoId) -> DomainResult<bool>;

    /// Subset of `repo_ids` with no bookkeeping row, preserving request
    /// order with duplicates collapsed. Must be computed with a single
    /// batched existence query, never one query per repo.
    async fn uncached(&self, query_name: &str, repo_ids: &[RepoId]) -> DomainResult<Vec<RepoId>>;

    /// Insert one bookkeeping row per repo with the current timestamp.
    /// Duplicate rows are harmless; they only affect freshness reporting.
    async fn record_cached(&self, query_name: &str, repo_ids: &[RepoId]) -> DomainResult<()>;

    /// Most recent cached_at per repo for a query, for freshness display.
    async fn freshness(&self, query_name: &str) -> DomainResult<Vec<(RepoId, DateTime<Utc>)>>;
}
