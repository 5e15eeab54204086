//! Domain models for the knotcache system.

pub mod config;
pub mod job;
pub mod query;
pub mod result_set;

pub use config::{Config, DatabaseConfig, LoggingConfig, RetryConfig};
pub use job::{FillJob, FillOutcome, JobHandle, JobStatus};
pub use query::{ColumnSpec, QueryDef, REPO_IDS_PLACEHOLDER, REPO_ID_COLUMN};
pub use result_set::{RepoId, ResultSet};
