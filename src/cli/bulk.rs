use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::cli::search::{label, print_text_result, tsv_header, tsv_row};
use crate::cli::OutputFormat;
use crate::client::RemoteMatcher;
use crate::config::ResolverConfig;
use crate::core::result::MatchResult;
use crate::core::search::Search;
use crate::parsing::tsv::parse_search_file;
use crate::service::MatchService;
use crate::utils::validation::validate_search;

#[derive(Args)]
pub struct BulkArgs {
    /// TSV/CSV file of searches; the header row names the search fields
    /// (`scientificName`, `kingdom`, `hint.family`, ...). Gzipped files are accepted.
    #[arg(required = true)]
    pub input: PathBuf,

    /// Resolve against a running server (e.g. `http://localhost:8080`)
    #[arg(long)]
    pub remote: Option<String>,
}

/// Resolve every row of a search file
///
/// # Errors
///
/// Returns an error if the file cannot be parsed, a row is invalid, or
/// resolution fails.
pub fn run(args: BulkArgs, format: OutputFormat, config: &ResolverConfig) -> anyhow::Result<()> {
    let searches = parse_search_file(&args.input)?;
    for (i, search) in searches.iter().enumerate() {
        if let Some(search) = search {
            validate_search(search).map_err(|e| anyhow::anyhow!("Row {}: {e}", i + 1))?;
        }
    }

    let results = if let Some(url) = &args.remote {
        info!("Resolving {} rows against {url}", searches.len());
        RemoteMatcher::new(url, config.search_cache)?.match_all(&searches)?
    } else {
        let service = MatchService::from_config(config)?;
        let results = service.match_all(&searches)?;
        service.log_cache_stats();
        results
    };

    let matched = results.iter().flatten().filter(|r| r.success).count();
    info!("Matched {matched} of {} rows", results.len());

    match format {
        OutputFormat::Text => print_text_results(&searches, &results),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Tsv => {
            println!("row\t{}", tsv_header());
            for (i, (search, result)) in searches.iter().zip(&results).enumerate() {
                let query = search.as_ref().map_or_else(String::new, label);
                println!("{}\t{}", i + 1, tsv_row(&query, result.as_ref()));
            }
        }
    }

    Ok(())
}

fn print_text_results(searches: &[Option<Search>], results: &[Option<MatchResult>]) {
    for (i, (search, result)) in searches.iter().zip(results).enumerate() {
        println!("Row {}", i + 1);
        match (search, result) {
            (Some(search), Some(result)) => print_text_result(&label(search), result),
            _ => println!("(empty row)"),
        }
        println!();
    }

    let matched = results.iter().flatten().filter(|r| r.success).count();
    println!("Matched {matched} of {} rows", results.len());
}
