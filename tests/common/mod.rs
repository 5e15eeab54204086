//! Shared fixtures for the integration tests: a migrated in-memory cache
//! store, a seeded primary source, and instrumented port stubs.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use knotcache::adapters::sqlite::{
    create_migrated_test_pool, create_test_pool, SqliteBookkeepingStore, SqliteResultStore,
    SqliteSourceReader,
};
use knotcache::domain::errors::{DomainError, DomainResult};
use knotcache::domain::models::{ColumnSpec, QueryDef, RepoId, ResultSet};
use knotcache::domain::ports::{BookkeepingStore, ResultStore, SourceCursor, SourceReader};
use knotcache::services::CacheCoordinator;

pub const TEST_PAGE_SIZE: i64 = 2;

/// Cache store with the bookkeeping schema applied.
pub async fn setup_cache_pool() -> SqlitePool {
    create_migrated_test_pool()
        .await
        .expect("failed to create migrated cache pool")
}

/// Primary source with a small commits table: repos 101 and 102 have rows,
/// repo 103 exists in the world but has no commits.
pub async fn setup_source_pool() -> SqlitePool {
    let pool = create_test_pool()
        .await
        .expect("failed to create source pool");
    seed_commits(&pool).await;
    pool
}

pub async fn seed_commits(pool: &SqlitePool) {
    sqlx::query("CREATE TABLE commits (repo_id INTEGER NOT NULL, hash TEXT NOT NULL, author TEXT NOT NULL)")
        .execute(pool)
        .await
        .expect("failed to create commits table");
    let seed = [
        (101, "c1a", "alice"),
        (101, "c1b", "bob"),
        (101, "c1c", "alice"),
        (102, "c2a", "carol"),
        (102, "c2b", "carol"),
    ];
    for (repo_id, hash, author) in seed {
        sqlx::query("INSERT INTO commits (repo_id, hash, author) VALUES (?, ?, ?)")
            .bind(repo_id)
            .bind(hash)
            .bind(author)
            .execute(pool)
            .await
            .expect("failed to seed commits");
    }
}

pub fn commits_query() -> QueryDef {
    QueryDef::new(
        "commits_query",
        "SELECT repo_id, hash, author FROM commits \
         WHERE repo_id IN ({repo_ids}) ORDER BY repo_id, hash",
        vec![
            ColumnSpec::new("repo_id", "INTEGER"),
            ColumnSpec::new("hash", "TEXT"),
            ColumnSpec::new("author", "TEXT"),
        ],
    )
}

/// The real sqlite stores wired into a coordinator, plus handles to the
/// stores for direct inspection.
pub struct TestStack {
    pub cache_pool: SqlitePool,
    pub bookkeeping: Arc<SqliteBookkeepingStore>,
    pub results: Arc<SqliteResultStore>,
    pub source_calls: Arc<CountingSourceReader>,
    pub coordinator: CacheCoordinator,
}

pub async fn setup_stack() -> TestStack {
    let cache_pool = setup_cache_pool().await;
    let source_pool = setup_source_pool().await;

    let bookkeeping = Arc::new(SqliteBookkeepingStore::new(cache_pool.clone()));
    let results = Arc::new(SqliteResultStore::new(cache_pool.clone()));
    let source_calls = Arc::new(CountingSourceReader::new(Arc::new(SqliteSourceReader::new(
        source_pool,
    ))));

    let coordinator = CacheCoordinator::new(
        Arc::clone(&bookkeeping) as Arc<dyn BookkeepingStore>,
        Arc::clone(&results) as Arc<dyn ResultStore>,
        Arc::clone(&source_calls) as Arc<dyn SourceReader>,
        TEST_PAGE_SIZE,
    );

    TestStack {
        cache_pool,
        bookkeeping,
        results,
        source_calls,
        coordinator,
    }
}

/// Delegating source reader that counts query executions and served pages,
/// and remembers the repo set of the most recent execution.
pub struct CountingSourceReader {
    inner: Arc<dyn SourceReader>,
    calls: AtomicUsize,
    pages: Arc<AtomicUsize>,
    last_repos: std::sync::Mutex<Vec<RepoId>>,
}

impl CountingSourceReader {
    pub fn new(inner: Arc<dyn SourceReader>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            pages: Arc::new(AtomicUsize::new(0)),
            last_repos: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Number of source query executions.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of non-empty pages served across all executions.
    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }

    pub fn last_repos(&self) -> Vec<RepoId> {
        self.last_repos.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl SourceReader for CountingSourceReader {
    async fn fetch(
        &self,
        query: &QueryDef,
        repo_ids: &[RepoId],
    ) -> DomainResult<Box<dyn SourceCursor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_repos.lock().expect("lock poisoned") = repo_ids.to_vec();
        let inner = self.inner.fetch(query, repo_ids).await?;
        Ok(Box::new(CountingCursor {
            inner,
            pages: Arc::clone(&self.pages),
        }))
    }
}

struct CountingCursor {
    inner: Box<dyn SourceCursor>,
    pages: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceCursor for CountingCursor {
    async fn next_page(&mut self, limit: i64) -> DomainResult<Option<ResultSet>> {
        let page = self.inner.next_page(limit).await?;
        if page.is_some() {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }
        Ok(page)
    }
}

/// Source reader whose executions always fail, for exercising the retry
/// path.
pub struct FailingSourceReader;

#[async_trait]
impl SourceReader for FailingSourceReader {
    async fn fetch(
        &self,
        _query: &QueryDef,
        _repo_ids: &[RepoId],
    ) -> DomainResult<Box<dyn SourceCursor>> {
        Err(DomainError::DatabaseError(
            "primary source unavailable".to_string(),
        ))
    }
}
