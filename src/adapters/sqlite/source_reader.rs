//! SQLite implementation of the SourceReader.

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::adapters::sqlite::{bind_markers, column_names, decode_row};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{QueryDef, RepoId, ResultSet, REPO_IDS_PLACEHOLDER};
use crate::domain::ports::{SourceCursor, SourceReader};

/// Rows buffered between the streaming task and the cursor. Bounds memory
/// while the consumer is busy writing a page to the cache store.
const STREAM_BUFFER_ROWS: usize = 256;

type StreamedRow = DomainResult<(Vec<String>, Vec<Value>)>;

/// Reads registered queries against the primary analytical source. Each
/// fill executes its SQL once and streams the rows, so all pages observe
/// the same result set. Owns its pool; never shares connections with the
/// cache store.
#[derive(Clone)]
pub struct SqliteSourceReader {
    pool: SqlitePool,
}

impl SqliteSourceReader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Expand every `{repo_ids}` occurrence into a bind-marker list of `count`
/// markers. Returns the expanded SQL and the number of occurrences.
fn expand_repo_placeholder(sql: &str, count: usize) -> DomainResult<(String, usize)> {
    let occurrences = sql.matches(REPO_IDS_PLACEHOLDER).count();
    if occurrences == 0 {
        return Err(DomainError::InvalidQuery(format!(
            "SQL is missing the {REPO_IDS_PLACEHOLDER} placeholder"
        )));
    }
    let expanded = sql.replace(REPO_IDS_PLACEHOLDER, &bind_markers(count));
    Ok((expanded, occurrences))
}

#[async_trait]
impl SourceReader for SqliteSourceReader {
    async fn fetch(
        &self,
        query: &QueryDef,
        repo_ids: &[RepoId],
    ) -> DomainResult<Box<dyn SourceCursor>> {
        let registered: Vec<String> = query.columns.iter().map(|c| c.name.clone()).collect();

        let (tx, rx) = mpsc::channel::<StreamedRow>(STREAM_BUFFER_ROWS);
        if repo_ids.is_empty() {
            // Dropping the sender yields an immediately exhausted cursor.
            drop(tx);
            return Ok(Box::new(SqliteSourceCursor {
                rx,
                columns: None,
                fallback: registered,
            }));
        }

        let (expanded, occurrences) = expand_repo_placeholder(&query.sql, repo_ids.len())?;
        let pool = self.pool.clone();
        let repo_ids = repo_ids.to_vec();

        tokio::spawn(async move {
            let mut stmt = sqlx::query(&expanded);
            for _ in 0..occurrences {
                for id in &repo_ids {
                    stmt = stmt.bind(id);
                }
            }
            let mut stream = stmt.fetch(&pool);
            loop {
                match stream.try_next().await {
                    Ok(Some(row)) => {
                        let item = decode_row(&row).map(|cells| (column_names(&row), cells));
                        if tx.send(item).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => return,
                    Err(err) => {
                        let _ = tx.send(Err(err.into())).await;
                        return;
                    }
                }
            }
        });

        Ok(Box::new(SqliteSourceCursor {
            rx,
            columns: None,
            fallback: registered,
        }))
    }
}

pub struct SqliteSourceCursor {
    rx: mpsc::Receiver<StreamedRow>,
    /// Select-order column names, captured from the first streamed row.
    columns: Option<Vec<String>>,
    /// Registered column names, used when the result set has no rows.
    fallback: Vec<String>,
}

#[async_trait]
impl SourceCursor for SqliteSourceCursor {
    async fn next_page(&mut self, limit: i64) -> DomainResult<Option<ResultSet>> {
        let limit = usize::try_from(limit).unwrap_or(1).max(1);

        let mut rows: Vec<Vec<Value>> = Vec::new();
        while rows.len() < limit {
            match self.rx.recv().await {
                Some(Ok((names, cells))) => {
                    if self.columns.is_none() {
                        self.columns = Some(names);
                    }
                    rows.push(cells);
                }
                Some(Err(err)) => return Err(err),
                None => break,
            }
        }

        if rows.is_empty() {
            return Ok(None);
        }
        let columns = self
            .columns
            .clone()
            .unwrap_or_else(|| self.fallback.clone());
        let mut page = ResultSet::new(columns);
        for row in rows {
            page.push_row(row)?;
        }
        Ok(Some(page))
    }
}
