//! Implementation of the `knotcache init` command.

use anyhow::{Context, Result};

use crate::adapters::sqlite::initialize_cache_store;
use crate::domain::models::Config;

pub async fn execute(config: &Config) -> Result<()> {
    initialize_cache_store(&config.cache)
        .await
        .context("Failed to initialize cache store")?;
    println!("Cache store initialized at {}", config.cache.url);
    Ok(())
}
