//! Registered analytical query definitions.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Placeholder in registered SQL text that is expanded into the repo-id bind
/// list. May appear more than once if the query references the list twice.
pub const REPO_IDS_PLACEHOLDER: &str = "{repo_ids}";

/// Column that every result table must carry as its join/filter key.
pub const REPO_ID_COLUMN: &str = "repo_id";

/// One column of a query's result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ColumnSpec {
    pub name: String,
    /// SQL type used in the result table DDL (e.g. `INTEGER`, `TEXT`, `REAL`).
    pub sql_type: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// A registered analytical query.
///
/// The `name` is the stable cache key: it identifies the query in the
/// bookkeeping table and doubles as the result table name. It is deliberately
/// decoupled from any code artifact's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueryDef {
    pub name: String,

    /// SQL executed against the primary source, containing the
    /// `{repo_ids}` placeholder for the repo-id list.
    pub sql: String,

    /// Result table schema. Must include a `repo_id` column.
    pub columns: Vec<ColumnSpec>,

    /// Columns forming the conflict-ignore uniqueness constraint.
    /// Empty means all columns.
    #[serde(default)]
    pub unique_key: Vec<String>,
}

impl QueryDef {
    pub fn new(name: impl Into<String>, sql: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            columns,
            unique_key: Vec::new(),
        }
    }

    /// Columns that form the uniqueness constraint for conflict-ignore
    /// inserts: the declared key, or every column when none is declared.
    pub fn unique_columns(&self) -> Vec<&str> {
        if self.unique_key.is_empty() {
            self.columns.iter().map(|c| c.name.as_str()).collect()
        } else {
            self.unique_key.iter().map(String::as_str).collect()
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !is_valid_identifier(&self.name) {
            return Err(DomainError::InvalidIdentifier(self.name.clone()));
        }
        if self.columns.is_empty() {
            return Err(DomainError::InvalidQuery(format!(
                "query '{}' declares no result columns",
                self.name
            )));
        }
        for col in &self.columns {
            if !is_valid_identifier(&col.name) {
                return Err(DomainError::InvalidIdentifier(col.name.clone()));
            }
            if !is_valid_sql_type(&col.sql_type) {
                return Err(DomainError::InvalidQuery(format!(
                    "query '{}' column '{}' has unsupported type '{}'",
                    self.name, col.name, col.sql_type
                )));
            }
        }
        if !self.columns.iter().any(|c| c.name == REPO_ID_COLUMN) {
            return Err(DomainError::MissingRepoIdColumn(self.name.clone()));
        }
        for key in &self.unique_key {
            if !self.columns.iter().any(|c| &c.name == key) {
                return Err(DomainError::InvalidQuery(format!(
                    "query '{}' unique_key names unknown column '{}'",
                    self.name, key
                )));
            }
        }
        if !self.sql.contains(REPO_IDS_PLACEHOLDER) {
            return Err(DomainError::InvalidQuery(format!(
                "query '{}' SQL is missing the {} placeholder",
                self.name, REPO_IDS_PLACEHOLDER
            )));
        }
        Ok(())
    }
}

/// Identifiers are interpolated into DDL and SELECT statements, so only a
/// conservative charset is accepted: lowercase snake_case, not starting with
/// a digit.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn is_valid_sql_type(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '(' || c == ')' || c == ',')
}
