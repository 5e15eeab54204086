//! Command-line interface for knotcache.

pub mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::sqlite::{
    create_pool, initialize_cache_store, verify_connection, SqliteBookkeepingStore,
    SqliteResultStore, SqliteSourceReader,
};
use crate::domain::models::Config;
use crate::domain::ports::{BookkeepingStore, ResultStore, SourceReader};
use crate::services::{
    CacheCoordinator, LocalDispatcher, QueryRegistry, RetrievalService, RetryPolicy,
};

#[derive(Parser)]
#[command(name = "knotcache", version, about = "Repo-scoped analytical result cache")]
pub struct Cli {
    /// Path to the configuration file (defaults to knotcache.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the cache store schema
    Init,
    /// List registered queries
    Queries,
    /// Schedule a fill job for a query and wait for it to finish
    Fill(commands::fill::FillArgs),
    /// Read cached rows for a query and repo list
    Show(commands::show::ShowArgs),
    /// Show bookkeeping freshness for a query
    Status(commands::status::StatusArgs),
}

pub fn handle_error(err: anyhow::Error) {
    eprintln!("Error: {err:#}");
    std::process::exit(1);
}

/// Wired-up services shared by the data-path commands.
pub struct AppContext {
    pub registry: Arc<QueryRegistry>,
    pub coordinator: Arc<CacheCoordinator>,
    pub retrieval: RetrievalService,
    pub dispatcher: LocalDispatcher,
    pub bookkeeping: Arc<SqliteBookkeepingStore>,
}

/// Open both endpoints and wire the services. The source pool and cache
/// pool are distinct by construction.
pub async fn build_context(config: &Config) -> Result<AppContext> {
    let cache_pool = initialize_cache_store(&config.cache)
        .await
        .context("Failed to open cache store")?;
    let source_pool = create_pool(&config.source)
        .await
        .context("Failed to open primary source")?;
    verify_connection(&source_pool)
        .await
        .context("Primary source is unreachable")?;

    let bookkeeping = Arc::new(SqliteBookkeepingStore::new(cache_pool.clone()));
    let results = Arc::new(SqliteResultStore::new(cache_pool));
    let source = Arc::new(SqliteSourceReader::new(source_pool));

    let registry = Arc::new(
        QueryRegistry::new(config.queries.clone()).context("Invalid query registration")?,
    );
    let coordinator = Arc::new(CacheCoordinator::new(
        Arc::clone(&bookkeeping) as Arc<dyn BookkeepingStore>,
        Arc::clone(&results) as Arc<dyn ResultStore>,
        source as Arc<dyn SourceReader>,
        config.page_size,
    ));
    let retrieval = RetrievalService::new(
        Arc::clone(&bookkeeping) as Arc<dyn BookkeepingStore>,
        results as Arc<dyn ResultStore>,
    );
    let dispatcher = LocalDispatcher::new(
        Arc::clone(&coordinator),
        Arc::clone(&registry),
        RetryPolicy::from_config(&config.retry),
    );

    Ok(AppContext {
        registry,
        coordinator,
        retrieval,
        dispatcher,
        bookkeeping,
    })
}
