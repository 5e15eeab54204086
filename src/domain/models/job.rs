//! Fill jobs: one scheduled execution of fetch-and-cache for a query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::result_set::RepoId;

/// Opaque handle returned when a fill job is scheduled.
pub type JobHandle = Uuid;

/// Lifecycle of a fill job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Scheduled but not yet picked up by a worker
    Pending,
    /// Currently fetching and writing
    Running,
    /// Bookkeeping and result rows committed
    Succeeded,
    /// Retries exhausted; no partial commit is visible
    Failed,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "succeeded" | "success" => Some(Self::Succeeded),
            "failed" | "failure" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One scheduled execution of "fetch uncached repos for a query".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillJob {
    pub id: JobHandle,
    pub query_name: String,
    pub repo_ids: Vec<RepoId>,
    pub status: JobStatus,
    /// Retries consumed so far; 0 while the first attempt is in flight.
    pub retries: u32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl FillJob {
    pub fn new(query_name: impl Into<String>, repo_ids: Vec<RepoId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            query_name: query_name.into(),
            repo_ids,
            status: JobStatus::Pending,
            retries: 0,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Result of a coordinator fill pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// Every requested repo already had a bookkeeping row; the primary
    /// source was not queried.
    AlreadyComplete,
    /// The missing subset was fetched and committed.
    Filled {
        fetched: Vec<RepoId>,
        rows_written: u64,
    },
}
