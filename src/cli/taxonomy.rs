use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::catalog::store::TaxonomyIndex;
use crate::cli::OutputFormat;
use crate::config::ResolverConfig;
use crate::core::types::Rank;
use crate::groups::{builder, SpeciesGroups};
use crate::matching::classifier::Classifier;

#[derive(Args)]
pub struct TaxonomyArgs {
    #[command(subcommand)]
    pub command: TaxonomyCommands,
}

#[derive(Subcommand)]
pub enum TaxonomyCommands {
    /// Show details of a taxon
    Show {
        /// Taxon identifier
        #[arg(required = true)]
        id: String,
    },

    /// List the species groups and the tree intervals they cover
    ListGroups,

    /// Export the taxonomy to a JSON file
    Export {
        /// Output file path
        #[arg(required = true)]
        output: PathBuf,
    },
}

/// Run a taxonomy subcommand
///
/// # Errors
///
/// Returns an error if the taxonomy cannot be loaded, a taxon is not found,
/// or output cannot be written.
pub fn run(args: TaxonomyArgs, format: OutputFormat, config: &ResolverConfig) -> anyhow::Result<()> {
    let index = config.load_taxonomy()?;
    match args.command {
        TaxonomyCommands::Show { id } => run_show(&id, &index, format, config),
        TaxonomyCommands::ListGroups => run_list_groups(&index, format, config),
        TaxonomyCommands::Export { output } => run_export(&output, &index),
    }
}

fn load_groups(index: &TaxonomyIndex, config: &ResolverConfig) -> anyhow::Result<SpeciesGroups> {
    let definitions = config.load_group_definitions()?;
    Ok(builder::build(&definitions, index)?)
}

fn run_show(
    id: &str,
    index: &TaxonomyIndex,
    format: OutputFormat,
    config: &ResolverConfig,
) -> anyhow::Result<()> {
    let concept = index
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("Taxon '{}' not found", id))?;

    match format {
        OutputFormat::Text => {
            println!("Taxon: {}\n", concept.scientific_name);
            println!("ID:       {}", concept.taxon_id);
            println!("Rank:     {}", concept.rank.as_str());
            println!("Status:   {:?}", concept.status);
            if let Some(authorship) = &concept.authorship {
                println!("Author:   {authorship}");
            }
            if let Some(accepted) = &concept.accepted_id {
                let name = index.get(accepted).map_or("?", |c| c.scientific_name.as_str());
                println!("Accepted: {name} ({accepted})");
            }
            if let (Some(left), Some(right)) = (concept.left, concept.right) {
                println!("Position: [{left}, {right})");

                let groups = load_groups(index, config)?;
                let names = groups.groups_containing(left);
                if !names.is_empty() {
                    println!("Groups:   {}", names.join(", "));
                }
            }

            println!("\nClassification:");
            for rank in Rank::LINNAEAN {
                if let Some(name) = concept.classification.name_at(rank) {
                    println!("  {:<8} {}", rank.as_str(), name);
                }
            }

            let vernaculars = index.vernacular_names(&concept.taxon_id, usize::MAX)?;
            if !vernaculars.is_empty() {
                println!("\nCommon names: {}", vernaculars.join(", "));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(concept)?);
        }
        OutputFormat::Tsv => {
            println!("rank\tname\tid");
            for rank in Rank::LINNAEAN {
                if let Some(name) = concept.classification.name_at(rank) {
                    println!(
                        "{}\t{}\t{}",
                        rank.as_str(),
                        name,
                        concept.classification.id_at(rank).unwrap_or("")
                    );
                }
            }
        }
    }

    Ok(())
}

fn run_list_groups(
    index: &TaxonomyIndex,
    format: OutputFormat,
    config: &ResolverConfig,
) -> anyhow::Result<()> {
    let groups = load_groups(index, config)?;

    match format {
        OutputFormat::Text => {
            println!("{:<25} {:<10} {:<15} Intervals", "Group", "Rank", "Parent");
            println!("{}", "-".repeat(70));
            for group in groups.iter() {
                let intervals: Vec<String> = group
                    .intervals
                    .iter()
                    .map(|i| {
                        let sign = if i.included { '+' } else { '-' };
                        format!("{sign}[{},{})", i.left, i.right)
                    })
                    .collect();
                println!(
                    "{:<25} {:<10} {:<15} {}",
                    group.name,
                    group.rank.as_str(),
                    group.parent.as_deref().unwrap_or("-"),
                    intervals.join(" ")
                );
            }
            println!("\nTotal: {} groups", groups.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
        OutputFormat::Tsv => {
            println!("name\trank\tparent\tleft\tright\tincluded");
            for group in groups.iter() {
                for interval in &group.intervals {
                    println!(
                        "{}\t{}\t{}\t{}\t{}\t{}",
                        group.name,
                        group.rank.as_str(),
                        group.parent.as_deref().unwrap_or(""),
                        interval.left,
                        interval.right,
                        interval.included
                    );
                }
            }
        }
    }

    Ok(())
}

fn run_export(output: &Path, index: &TaxonomyIndex) -> anyhow::Result<()> {
    let json = index.to_json()?;
    std::fs::write(output, json)?;

    println!("Exported {} taxa to {}", index.len(), output.display());

    Ok(())
}
