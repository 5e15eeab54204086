//! Implementation of the `knotcache queries` command.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::models::Config;
use crate::services::QueryRegistry;

pub fn execute(config: &Config) -> Result<()> {
    let registry =
        QueryRegistry::new(config.queries.clone()).context("Invalid query registration")?;

    if registry.is_empty() {
        println!("No queries registered");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["query", "columns", "unique key"]);
    for name in registry.names() {
        let Some(query) = registry.get(name) else {
            continue;
        };
        let columns = query
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let unique = query.unique_columns().join(", ");
        table.add_row(vec![name.to_string(), columns, unique]);
    }
    println!("{table}");
    Ok(())
}
