//! knotcache CLI entry point.

use clap::Parser;

use knotcache::cli::{build_context, handle_error, Cli, Commands};
use knotcache::infrastructure::config::ConfigLoader;
use knotcache::infrastructure::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_ref() {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => return handle_error(err),
    };

    if let Err(err) = logging::init(&config.logging) {
        return handle_error(err);
    }

    let result = match cli.command {
        Commands::Init => knotcache::cli::commands::init::execute(&config).await,
        Commands::Queries => knotcache::cli::commands::queries::execute(&config),
        Commands::Fill(args) => match build_context(&config).await {
            Ok(ctx) => knotcache::cli::commands::fill::execute(args, &ctx).await,
            Err(err) => Err(err),
        },
        Commands::Show(args) => match build_context(&config).await {
            Ok(ctx) => knotcache::cli::commands::show::execute(args, &ctx).await,
            Err(err) => Err(err),
        },
        Commands::Status(args) => match build_context(&config).await {
            Ok(ctx) => knotcache::cli::commands::status::execute(args, &ctx).await,
            Err(err) => Err(err),
        },
    };

    if let Err(err) = result {
        handle_error(err);
    }
}
