use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{FillJob, JobHandle, JobStatus, RepoId};

/// Port for scheduling fill work as asynchronous background jobs.
///
/// The transport is pluggable; the contract is retry-with-backoff on any
/// error, each retry being a full fresh `ensure_cached` invocation, and a
/// per-job status callers can poll or await. Overlapping jobs for the same
/// (query, repo) may run concurrently; conflict-tolerant writes make that
/// safe without a distributed lock.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Schedule a fill for the query against the given repos.
    async fn schedule(&self, query_name: &str, repo_ids: Vec<RepoId>) -> DomainResult<JobHandle>;

    /// Point-in-time status; never blocks.
    async fn status(&self, handle: JobHandle) -> DomainResult<JobStatus>;

    /// Await the job's terminal status. Event-driven, not a polling loop.
    async fn wait(&self, handle: JobHandle) -> DomainResult<JobStatus>;

    /// Snapshot of the job record, for status display.
    async fn job(&self, handle: JobHandle) -> DomainResult<FillJob>;
}
