//! Registry of named analytical queries.

use std::collections::HashMap;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::QueryDef;

/// Validated, name-keyed query registrations. The stable `query_name` is the
/// cache key; nothing here depends on any code artifact's identity.
pub struct QueryRegistry {
    queries: HashMap<String, QueryDef>,
}

impl QueryRegistry {
    /// Build a registry, validating every definition and rejecting
    /// duplicate names.
    pub fn new(queries: Vec<QueryDef>) -> DomainResult<Self> {
        let mut map = HashMap::with_capacity(queries.len());
        for query in queries {
            query.validate()?;
            if map.insert(query.name.clone(), query).is_some() {
                return Err(DomainError::InvalidQuery(
                    "duplicate query name in registration".to_string(),
                ));
            }
        }
        Ok(Self { queries: map })
    }

    pub fn get(&self, name: &str) -> Option<&QueryDef> {
        self.queries.get(name)
    }

    pub fn require(&self, name: &str) -> DomainResult<QueryDef> {
        self.queries
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::QueryNotFound(name.to_string()))
    }

    /// Registered names, sorted for stable display.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.queries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
