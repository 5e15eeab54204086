//! knotcache - Repo-scoped analytical result cache
//!
//! knotcache sits between a primary analytics database and its readers. It
//! executes registered queries against the primary source and streams the
//! rows into a per-query cache table in pages, tracking per-repo cache
//! state in a bookkeeping store so later requests only fetch what is missing.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Query definitions, result sets, jobs, ports
//! - **Adapters Layer** (`adapters`): SQLite implementations of the ports
//! - **Service Layer** (`services`): Cache coordination, retrieval, dispatch
//! - **Infrastructure Layer** (`infrastructure`): Configuration loading
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use knotcache::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let ctx = knotcache::cli::build_context(&config).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    ColumnSpec, Config, DatabaseConfig, FillJob, FillOutcome, JobHandle, JobStatus, LoggingConfig,
    QueryDef, RepoId, ResultSet, RetryConfig,
};
pub use domain::ports::{BookkeepingStore, JobDispatcher, ResultStore, SourceCursor, SourceReader};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    CacheCoordinator, LocalDispatcher, QueryRegistry, ReadOutcome, RetrievalService, RetryPolicy,
};
