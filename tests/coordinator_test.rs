mod common;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use knotcache::adapters::sqlite::{
    create_pool, SqliteBookkeepingStore, SqliteResultStore, SqliteSourceReader,
};
use knotcache::domain::errors::DomainResult;
use knotcache::domain::models::{DatabaseConfig, FillOutcome, QueryDef, RepoId, ResultSet};
use knotcache::domain::ports::{BookkeepingStore, ResultStore, SourceCursor, SourceReader};
use knotcache::services::CacheCoordinator;

use common::{commits_query, seed_commits, setup_cache_pool, setup_stack, TEST_PAGE_SIZE};

#[tokio::test]
async fn test_fill_then_read_end_to_end() {
    let stack = setup_stack().await;
    let query = commits_query();

    let outcome = stack
        .coordinator
        .ensure_cached(&query, &[101, 102])
        .await
        .expect("fill failed");
    assert_eq!(
        outcome,
        FillOutcome::Filled {
            fetched: vec![101, 102],
            rows_written: 5,
        }
    );

    assert!(stack
        .bookkeeping
        .is_cached("commits_query", 101)
        .await
        .expect("is_cached failed"));
    assert!(stack
        .bookkeeping
        .is_cached("commits_query", 102)
        .await
        .expect("is_cached failed"));

    let table = stack
        .results
        .read("commits_query", &[101, 102])
        .await
        .expect("read failed");
    assert_eq!(table.len(), 5);
    assert_eq!(table.columns, vec!["repo_id", "hash", "author"]);
}

#[tokio::test]
async fn test_second_fill_is_a_no_op() {
    let stack = setup_stack().await;
    let query = commits_query();

    stack
        .coordinator
        .ensure_cached(&query, &[101, 102])
        .await
        .expect("first fill failed");
    let calls_after_first = stack.source_calls.calls();

    let outcome = stack
        .coordinator
        .ensure_cached(&query, &[101, 102])
        .await
        .expect("second fill failed");
    assert_eq!(outcome, FillOutcome::AlreadyComplete);
    assert_eq!(stack.source_calls.calls(), calls_after_first);
}

#[tokio::test]
async fn test_partial_overlap_fetches_only_missing_repos() {
    let stack = setup_stack().await;
    let query = commits_query();

    stack
        .coordinator
        .ensure_cached(&query, &[101])
        .await
        .expect("first fill failed");

    let outcome = stack
        .coordinator
        .ensure_cached(&query, &[101, 102])
        .await
        .expect("second fill failed");
    let FillOutcome::Filled { fetched, .. } = outcome else {
        panic!("expected a fill for repo 102");
    };
    assert_eq!(fetched, vec![102]);
    // The source only ever saw the missing repo.
    assert_eq!(stack.source_calls.last_repos(), vec![102]);
}

#[tokio::test]
async fn test_source_executes_once_and_pages_are_bounded() {
    let stack = setup_stack().await;
    let query = commits_query();

    // 5 seeded rows at page size 2: one execution, streamed as two full
    // pages and a final short one.
    stack
        .coordinator
        .ensure_cached(&query, &[101, 102])
        .await
        .expect("fill failed");
    assert_eq!(stack.source_calls.calls(), 1);
    assert_eq!(stack.source_calls.pages(), 3);
}

/// Delegating reader whose cursor deletes a source row after serving the
/// first page, simulating a concurrent mutation mid-fill.
struct MutatingSourceReader {
    inner: SqliteSourceReader,
    pool: SqlitePool,
}

#[async_trait]
impl SourceReader for MutatingSourceReader {
    async fn fetch(
        &self,
        query: &QueryDef,
        repo_ids: &[RepoId],
    ) -> DomainResult<Box<dyn SourceCursor>> {
        let inner = self.inner.fetch(query, repo_ids).await?;
        Ok(Box::new(MutatingCursor {
            inner,
            pool: self.pool.clone(),
            mutated: false,
        }))
    }
}

struct MutatingCursor {
    inner: Box<dyn SourceCursor>,
    pool: SqlitePool,
    mutated: bool,
}

#[async_trait]
impl SourceCursor for MutatingCursor {
    async fn next_page(&mut self, limit: i64) -> DomainResult<Option<ResultSet>> {
        let page = self.inner.next_page(limit).await?;
        if !self.mutated {
            self.mutated = true;
            sqlx::query("DELETE FROM commits WHERE hash = 'h2'")
                .execute(&self.pool)
                .await
                .expect("mid-fill delete failed");
        }
        Ok(page)
    }
}

#[tokio::test]
async fn test_fill_observes_one_consistent_result_set() {
    // File-backed source so the mutation runs on its own connection while
    // the fill's statement is streaming.
    let dir = tempfile::tempdir().expect("tempdir failed");
    let config = DatabaseConfig {
        url: format!("sqlite:{}/source.db", dir.path().display()),
        max_connections: 4,
    };
    let source_pool = create_pool(&config).await.expect("source pool failed");
    seed_commits(&source_pool).await;
    for hash in ["h1", "h2", "h3", "h4"] {
        sqlx::query("INSERT INTO commits (repo_id, hash, author) VALUES (104, ?, 'dave')")
            .bind(hash)
            .execute(&source_pool)
            .await
            .expect("failed to seed repo 104");
    }

    let cache_pool = setup_cache_pool().await;
    let bookkeeping = Arc::new(SqliteBookkeepingStore::new(cache_pool.clone()));
    let results = Arc::new(SqliteResultStore::new(cache_pool));
    let source = Arc::new(MutatingSourceReader {
        inner: SqliteSourceReader::new(source_pool.clone()),
        pool: source_pool,
    });
    let coordinator = CacheCoordinator::new(
        Arc::clone(&bookkeeping) as Arc<dyn BookkeepingStore>,
        Arc::clone(&results) as Arc<dyn ResultStore>,
        source as Arc<dyn SourceReader>,
        TEST_PAGE_SIZE,
    );

    coordinator
        .ensure_cached(&commits_query(), &[104])
        .await
        .expect("fill failed");

    // Every row of the result set the query executed against is cached,
    // including those after the deleted row's position.
    let table = results
        .read("commits_query", &[104])
        .await
        .expect("read failed");
    assert_eq!(table.len(), 4);
    let hash_idx = table.column_index("hash").expect("hash column missing");
    let mut hashes: Vec<&str> = table
        .rows
        .iter()
        .map(|row| row[hash_idx].as_str().expect("hash should be text"))
        .collect();
    hashes.sort_unstable();
    assert_eq!(hashes, vec!["h1", "h2", "h3", "h4"]);
    assert!(bookkeeping
        .is_cached("commits_query", 104)
        .await
        .expect("is_cached failed"));
}

#[tokio::test]
async fn test_zero_row_repo_is_still_marked_cached() {
    let stack = setup_stack().await;
    let query = commits_query();

    let outcome = stack
        .coordinator
        .ensure_cached(&query, &[103])
        .await
        .expect("fill failed");
    assert_eq!(
        outcome,
        FillOutcome::Filled {
            fetched: vec![103],
            rows_written: 0,
        }
    );

    // "Cached" asserts the complete answer is present, even when empty.
    assert!(stack
        .bookkeeping
        .is_cached("commits_query", 103)
        .await
        .expect("is_cached failed"));
    let table = stack
        .results
        .read("commits_query", &[103])
        .await
        .expect("read failed");
    assert!(table.is_empty());
}

#[tokio::test]
async fn test_empty_request_never_touches_the_source() {
    let stack = setup_stack().await;
    let query = commits_query();

    let outcome = stack
        .coordinator
        .ensure_cached(&query, &[])
        .await
        .expect("fill failed");
    assert_eq!(outcome, FillOutcome::AlreadyComplete);
    assert_eq!(stack.source_calls.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_duplicate_fills_do_not_duplicate_rows() {
    let stack = setup_stack().await;
    let query = commits_query();

    let (a, b) = tokio::join!(
        stack.coordinator.ensure_cached(&query, &[101, 102]),
        stack.coordinator.ensure_cached(&query, &[101, 102]),
    );
    a.expect("first concurrent fill failed");
    b.expect("second concurrent fill failed");

    // Conflict-ignore writes make the race harmless.
    let table = stack
        .results
        .read("commits_query", &[101, 102])
        .await
        .expect("read failed");
    assert_eq!(table.len(), 5);
}
