//! Implementation of the `knotcache status` command.

use anyhow::Result;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::cli::AppContext;
use crate::domain::ports::BookkeepingStore;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Registered query name
    pub query: String,
}

pub async fn execute(args: StatusArgs, ctx: &AppContext) -> Result<()> {
    let fresh = ctx.bookkeeping.freshness(&args.query).await?;

    if fresh.is_empty() {
        println!("No repos cached for '{}'", args.query);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["repo_id", "last cached at"]);
    for (repo_id, cached_at) in &fresh {
        table.add_row(vec![repo_id.to_string(), cached_at.to_rfc3339()]);
    }
    println!("{table}");
    println!("{} repos cached for '{}'", fresh.len(), args.query);
    Ok(())
}
