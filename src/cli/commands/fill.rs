//! Implementation of the `knotcache fill` command.

use anyhow::{bail, Result};
use clap::Args;

use crate::cli::AppContext;
use crate::domain::models::{JobStatus, RepoId};
use crate::domain::ports::JobDispatcher;

#[derive(Args, Debug)]
pub struct FillArgs {
    /// Registered query name
    pub query: String,

    /// Comma-separated repo IDs to cache
    #[arg(long, value_delimiter = ',', required = true)]
    pub repos: Vec<RepoId>,
}

pub async fn execute(args: FillArgs, ctx: &AppContext) -> Result<()> {
    let handle = ctx.dispatcher.schedule(&args.query, args.repos).await?;
    println!("Scheduled fill job {handle}");

    let status = ctx.dispatcher.wait(handle).await?;
    let job = ctx.dispatcher.job(handle).await?;
    match status {
        JobStatus::Succeeded => {
            println!("Fill job {handle} succeeded");
            Ok(())
        }
        JobStatus::Failed => {
            let reason = job.error.unwrap_or_else(|| "unknown error".to_string());
            bail!("Fill job {handle} failed: {reason}");
        }
        other => bail!("Fill job {handle} ended in non-terminal status {}", other.as_str()),
    }
}
