//! Dynamic tabular data moved between the primary source and the cache.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::query::REPO_ID_COLUMN;

/// Integer identifier of a source-control repository tracked by the
/// analytical source.
pub type RepoId = i64;

/// A page or union of query result rows.
///
/// Schemas vary per query, so cells are dynamically typed. Column order is
/// significant: every row has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row. The cell count must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> DomainResult<()> {
        if row.len() != self.columns.len() {
            return Err(DomainError::SerializationError(format!(
                "row has {} cells, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Distinct repo ids present in the rows, for integrity checks.
    pub fn distinct_repo_ids(&self) -> DomainResult<BTreeSet<RepoId>> {
        let idx = self
            .column_index(REPO_ID_COLUMN)
            .ok_or_else(|| DomainError::MissingRepoIdColumn(self.columns.join(", ")))?;

        let mut ids = BTreeSet::new();
        for row in &self.rows {
            let id = row[idx].as_i64().ok_or_else(|| {
                DomainError::SerializationError(format!(
                    "non-integer repo_id cell: {}",
                    row[idx]
                ))
            })?;
            ids.insert(id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResultSet {
        let mut rs = ResultSet::new(vec!["repo_id".to_string(), "hash".to_string()]);
        rs.push_row(vec![json!(101), json!("abc")]).unwrap();
        rs.push_row(vec![json!(101), json!("def")]).unwrap();
        rs.push_row(vec![json!(102), json!("ghi")]).unwrap();
        rs
    }

    #[test]
    fn test_distinct_repo_ids() {
        let ids = sample().distinct_repo_ids().unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![101, 102]);
    }

    #[test]
    fn test_push_row_arity_mismatch() {
        let mut rs = ResultSet::new(vec!["repo_id".to_string()]);
        assert!(rs.push_row(vec![json!(1), json!(2)]).is_err());
    }

    #[test]
    fn test_missing_repo_id_column() {
        let rs = ResultSet::new(vec!["hash".to_string()]);
        assert!(matches!(
            rs.distinct_repo_ids(),
            Err(DomainError::MissingRepoIdColumn(_))
        ));
    }
}
