//! Command-line interface for taxon-solver.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **search**: Resolve a single name or classification
//! - **bulk**: Resolve a TSV/CSV list of searches, locally or against a server
//! - **taxonomy**: Show taxa, list species groups, or export the taxonomy
//! - **serve**: Start the HTTP API
//!
//! ## Usage
//!
//! ```text
//! # Resolve a name
//! taxon-solver search "Acacia dealbata"
//!
//! # Disambiguate a homonym and check the family
//! taxon-solver search Morus --kingdom Animalia --hint family=Sulidae
//!
//! # JSON output for scripting
//! taxon-solver search "Acacia dealbata" --format json
//!
//! # Resolve a list against a running server
//! taxon-solver bulk names.tsv --remote http://localhost:8080
//!
//! # Start the server
//! taxon-solver serve --port 8080
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ResolverConfig;

pub mod bulk;
pub mod search;
pub mod taxonomy;

#[derive(Parser)]
#[command(name = "taxon-solver")]
#[command(version)]
#[command(about = "Resolve taxonomic names and classifications to a single best-matching taxon")]
#[command(
    long_about = "taxon-solver resolves messy scientific names, vernacular names, identifiers and partial classifications against a reference taxonomy.\n\nIt tries a chain of increasingly permissive strategies and reports:\n- The accepted taxon and its higher classification\n- How the match was made\n- Issues found along the way (synonyms, homonyms, hint mismatches)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Taxonomy file (JSON or Darwin Core TSV), overriding the configuration
    #[arg(long, global = true)]
    pub taxonomy: Option<PathBuf>,

    /// Species group definitions, overriding the configuration
    #[arg(long, global = true)]
    pub species_groups: Option<PathBuf>,
}

impl Cli {
    /// The configuration file (or defaults) with command-line overrides applied
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded.
    pub fn resolver_config(&self) -> anyhow::Result<ResolverConfig> {
        let mut config = ResolverConfig::load_or_default(self.config.as_deref())?;
        if let Some(path) = &self.taxonomy {
            config.taxonomy = Some(path.clone());
        }
        if let Some(path) = &self.species_groups {
            config.species_groups = Some(path.clone());
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a single name or classification
    Search(search::SearchArgs),

    /// Resolve a list of searches from a TSV/CSV file
    Bulk(bulk::BulkArgs),

    /// Inspect the reference taxonomy
    Taxonomy(taxonomy::TaxonomyArgs),

    /// Start the web server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
