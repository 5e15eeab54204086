//! The read path: unioned result retrieval with partial-readiness tolerance.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{sleep, Instant};
use tracing::{instrument, warn};

use crate::domain::models::{RepoId, ResultSet};
use crate::domain::ports::{BookkeepingStore, ResultStore};

/// Outcome of a non-blocking read attempt.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    /// Every requested repo is marked ready; the unioned rows follow.
    Ready(ResultSet),
    /// Some repos have no bookkeeping row yet. The caller decides whether
    /// to poll, await a job signal, or render partial data elsewhere.
    NotReady { missing: Vec<RepoId> },
}

impl ReadOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

pub struct RetrievalService {
    bookkeeping: Arc<dyn BookkeepingStore>,
    results: Arc<dyn ResultStore>,
}

impl RetrievalService {
    pub fn new(bookkeeping: Arc<dyn BookkeepingStore>, results: Arc<dyn ResultStore>) -> Self {
        Self {
            bookkeeping,
            results,
        }
    }

    /// Point-in-time read. Never blocks, never fetches from the source.
    ///
    /// Readiness is judged solely by the bookkeeping store; when ready, the
    /// returned repo-id set is soft-checked against the request. A repo
    /// that is marked but has no rows is reported as a data-integrity
    /// warning, not an error — its cached answer may legitimately be empty
    /// (so the warning can be spurious for zero-row repos), and callers can
    /// still use what they got.
    #[instrument(skip(self), fields(query = %query_name), err)]
    pub async fn try_read(&self, query_name: &str, repo_ids: &[RepoId]) -> Result<ReadOutcome> {
        if repo_ids.is_empty() {
            return Ok(ReadOutcome::Ready(ResultSet::default()));
        }

        let missing = self
            .bookkeeping
            .uncached(query_name, repo_ids)
            .await
            .context("Failed to check cache readiness")?;
        if !missing.is_empty() {
            return Ok(ReadOutcome::NotReady { missing });
        }

        let table = self
            .results
            .read(query_name, repo_ids)
            .await
            .context("Failed to read cached results")?;

        let present = table.distinct_repo_ids()?;
        let requested: BTreeSet<RepoId> = repo_ids.iter().copied().collect();
        let absent: Vec<RepoId> = requested.difference(&present).copied().collect();
        if !absent.is_empty() {
            warn!(
                query = query_name,
                ?absent,
                "bookkeeping reports repos ready but no rows were found"
            );
        }

        Ok(ReadOutcome::Ready(table))
    }

    /// Bounded poll-with-backoff around `try_read`, for callers without a
    /// job handle to await. Returns the last outcome at the deadline; it
    /// never blocks indefinitely.
    pub async fn wait_ready(
        &self,
        query_name: &str,
        repo_ids: &[RepoId],
        timeout: Duration,
    ) -> Result<ReadOutcome> {
        let deadline = Instant::now() + timeout;
        let mut delay = Duration::from_millis(100);

        loop {
            let outcome = self.try_read(query_name, repo_ids).await?;
            if outcome.is_ready() {
                return Ok(outcome);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(outcome);
            }
            sleep(delay.min(deadline - now)).await;
            delay = (delay * 2).min(Duration::from_secs(2));
        }
    }
}
