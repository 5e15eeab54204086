//! The fill path: fetch uncached repos from the primary source and commit
//! them to the cache store.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::domain::models::{FillOutcome, QueryDef, RepoId};
use crate::domain::ports::{BookkeepingStore, ResultStore, SourceReader};

/// Coordinates one query's cache fill.
///
/// The ordering contract is the heart of the design: result rows for the
/// missing repos are fully committed before any bookkeeping row is written,
/// so a reader that observes a bookkeeping row is guaranteed the data is
/// there. A fill that dies mid-write leaves its repos uncached and safely
/// retryable; it never leaves them marked-but-empty.
pub struct CacheCoordinator {
    bookkeeping: Arc<dyn BookkeepingStore>,
    results: Arc<dyn ResultStore>,
    source: Arc<dyn SourceReader>,
    page_size: i64,
}

impl CacheCoordinator {
    pub fn new(
        bookkeeping: Arc<dyn BookkeepingStore>,
        results: Arc<dyn ResultStore>,
        source: Arc<dyn SourceReader>,
        page_size: i64,
    ) -> Self {
        Self {
            bookkeeping,
            results,
            source,
            page_size,
        }
    }

    /// Make the cache complete for `repo_ids` under `query`.
    ///
    /// Fetches only the repos with no bookkeeping row. The source query
    /// executes once and its rows are streamed in bounded pages, each
    /// written with a conflict-ignore insert; a single execution means
    /// concurrent source mutations cannot shift rows across page
    /// boundaries. Bookkeeping is recorded for the **originally
    /// requested** list, not just the fetched subset: re-marking an
    /// already-cached repo is harmless and keeps the caller contract
    /// simple. Errors from either store propagate untouched so the
    /// dispatcher's retry policy sees them.
    #[instrument(skip(self, query), fields(query = %query.name), err)]
    pub async fn ensure_cached(
        &self,
        query: &QueryDef,
        repo_ids: &[RepoId],
    ) -> Result<FillOutcome> {
        if repo_ids.is_empty() {
            return Ok(FillOutcome::AlreadyComplete);
        }

        let missing = self
            .bookkeeping
            .uncached(&query.name, repo_ids)
            .await
            .context("Failed to split cached/uncached repos")?;

        if missing.is_empty() {
            debug!("All {} requested repos already cached", repo_ids.len());
            return Ok(FillOutcome::AlreadyComplete);
        }

        info!(
            "Filling {} of {} requested repos",
            missing.len(),
            repo_ids.len()
        );

        self.results
            .ensure_table(query)
            .await
            .context("Failed to ensure result table")?;

        let mut cursor = self
            .source
            .fetch(query, &missing)
            .await
            .context("Failed to execute query against primary source")?;

        let mut rows_written = 0u64;
        while let Some(page) = cursor
            .next_page(self.page_size)
            .await
            .context("Failed to read page from primary source")?
        {
            rows_written += self
                .results
                .write_batch(&query.name, &page)
                .await
                .context("Failed to write result batch")?;
        }

        // Mark-ready happens strictly after the last page is committed. A
        // repo the source returned zero rows for still gets marked: cached
        // means "we looked, and this is the complete answer".
        self.bookkeeping
            .record_cached(&query.name, repo_ids)
            .await
            .context("Failed to record bookkeeping rows")?;

        info!(
            "Fill complete: {} repos fetched, {} rows written",
            missing.len(),
            rows_written
        );
        Ok(FillOutcome::Filled {
            fetched: missing,
            rows_written,
        })
    }
}
