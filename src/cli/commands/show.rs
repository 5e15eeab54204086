//! Implementation of the `knotcache show` command.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Table};
use serde_json::Value;

use crate::cli::AppContext;
use crate::domain::models::{RepoId, ResultSet};
use crate::services::ReadOutcome;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Registered query name
    pub query: String,

    /// Comma-separated repo IDs to read
    #[arg(long, value_delimiter = ',', required = true)]
    pub repos: Vec<RepoId>,

    /// Seconds to wait for missing repos before giving up (0 = don't wait)
    #[arg(long, default_value_t = 0)]
    pub wait_secs: u64,
}

pub async fn execute(args: ShowArgs, ctx: &AppContext) -> Result<()> {
    let outcome = if args.wait_secs == 0 {
        ctx.retrieval.try_read(&args.query, &args.repos).await?
    } else {
        ctx.retrieval
            .wait_ready(&args.query, &args.repos, Duration::from_secs(args.wait_secs))
            .await?
    };

    match outcome {
        ReadOutcome::Ready(table) => {
            print_table(&table);
            println!("{} rows", table.len());
        }
        ReadOutcome::NotReady { missing } => {
            let ids = missing
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            println!("Not ready: repos [{ids}] are not cached yet");
        }
    }
    Ok(())
}

fn print_table(result: &ResultSet) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(result.columns.clone());
    for row in &result.rows {
        table.add_row(row.iter().map(render_cell).collect::<Vec<_>>());
    }
    println!("{table}");
}

fn render_cell(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
