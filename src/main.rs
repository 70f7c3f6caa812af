use clap::Parser;
use tracing_subscriber::EnvFilter;

use taxon_solver::cli::{self, Cli, Commands};
use taxon_solver::web;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("taxon_solver=debug,info")
    } else {
        EnvFilter::new("taxon_solver=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let config = cli.resolver_config()?;

    match cli.command {
        Commands::Search(args) => {
            cli::search::run(args, cli.format, &config)?;
        }
        Commands::Bulk(args) => {
            cli::bulk::run(args, cli.format, &config)?;
        }
        Commands::Taxonomy(args) => {
            cli::taxonomy::run(args, cli.format, &config)?;
        }
        Commands::Serve(args) => {
            web::server::run(args, &config)?;
        }
    }

    Ok(())
}
