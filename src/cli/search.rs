use clap::Args;

use crate::cli::OutputFormat;
use crate::config::ResolverConfig;
use crate::core::result::MatchResult;
use crate::core::search::{LocationSearch, Search};
use crate::core::types::{Rank, SearchStyle};
use crate::service::MatchService;
use crate::utils::validation::validate_search;

#[derive(Args)]
pub struct SearchArgs {
    /// Scientific name to resolve
    #[arg(required_unless_present_any = ["id", "vernacular"])]
    pub name: Option<String>,

    /// Taxon concept identifier, tried before any name
    #[arg(long)]
    pub id: Option<String>,

    /// Vernacular (common) name
    #[arg(long)]
    pub vernacular: Option<String>,

    /// Authorship of the scientific name
    #[arg(long)]
    pub authorship: Option<String>,

    #[arg(long)]
    pub kingdom: Option<String>,

    #[arg(long)]
    pub phylum: Option<String>,

    #[arg(long)]
    pub class: Option<String>,

    #[arg(long)]
    pub order: Option<String>,

    #[arg(long)]
    pub family: Option<String>,

    #[arg(long)]
    pub genus: Option<String>,

    /// Rank of the supplied name (e.g. "species")
    #[arg(long)]
    pub rank: Option<String>,

    /// Expected value at a rank, e.g. `family=Fabaceae` (repeatable)
    #[arg(long = "hint", value_parser = parse_hint)]
    pub hints: Vec<(String, String)>,

    /// Country where the organism was observed
    #[arg(long)]
    pub country: Option<String>,

    /// State or province where the organism was observed
    #[arg(long)]
    pub state_province: Option<String>,

    /// Search style (strict, fuzzy, match)
    #[arg(long)]
    pub style: Option<SearchStyle>,

    /// Also try the name as an identifier and as a vernacular name
    #[arg(long)]
    pub loose: bool,
}

fn parse_hint(s: &str) -> Result<(String, String), String> {
    let (rank, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid hint '{s}', expected rank=value"))?;
    let (rank, value) = (rank.trim(), value.trim());
    if rank.is_empty() || value.is_empty() {
        return Err(format!("invalid hint '{s}', expected rank=value"));
    }
    Ok((rank.to_lowercase(), value.to_string()))
}

impl SearchArgs {
    /// Build the search described by the arguments
    #[must_use]
    pub fn to_search(&self) -> Search {
        let location = LocationSearch {
            country: self.country.clone(),
            state_province: self.state_province.clone(),
            locality: None,
        };

        let mut search = Search {
            scientific_name: self.name.clone(),
            scientific_name_authorship: self.authorship.clone(),
            vernacular_name: self.vernacular.clone(),
            taxon_concept_id: self.id.clone(),
            kingdom: self.kingdom.clone(),
            phylum: self.phylum.clone(),
            class: self.class.clone(),
            order: self.order.clone(),
            family: self.family.clone(),
            genus: self.genus.clone(),
            rank: self.rank.clone(),
            location: (!location.is_empty()).then_some(location),
            style: self.style,
            loose: self.loose,
            ..Search::default()
        };
        for (rank, value) in &self.hints {
            search = search.with_hint(rank, [value.as_str()]);
        }
        search
    }
}

/// Resolve a single search
///
/// # Errors
///
/// Returns an error if the search is invalid, the taxonomy cannot be loaded,
/// or output cannot be written.
pub fn run(args: SearchArgs, format: OutputFormat, config: &ResolverConfig) -> anyhow::Result<()> {
    let search = args.to_search();
    validate_search(&search)?;

    let service = MatchService::from_config(config)?;
    let result = service.match_search(&search)?;

    match format {
        OutputFormat::Text => print_text_result(&label(&search), &result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Tsv => {
            println!("{}", tsv_header());
            println!("{}", tsv_row(&label(&search), Some(&result)));
        }
    }

    Ok(())
}

/// The text a search is reported under
pub(crate) fn label(search: &Search) -> String {
    search
        .scientific_name
        .as_deref()
        .or(search.vernacular_name.as_deref())
        .or(search.identifier())
        .or(search.genus.as_deref())
        .or(search.family.as_deref())
        .unwrap_or("-")
        .to_string()
}

pub(crate) fn print_text_result(query: &str, result: &MatchResult) {
    if !result.success {
        println!("No match for '{query}'");
        println!("Issues:     {}", result.issues.join(", "));
        return;
    }

    println!(
        "Match: {} ({})",
        result.scientific_name.as_deref().unwrap_or("-"),
        result.taxon_concept_id.as_deref().unwrap_or("-")
    );
    if let Some(authorship) = &result.scientific_name_authorship {
        println!("Authorship: {authorship}");
    }
    if let Some(rank) = result.rank {
        println!("Rank:       {}", rank.as_str());
    }
    if let Some(match_type) = result.match_type {
        println!("Match type: {match_type}");
    }
    if let Some(synonym_type) = result.synonym_type {
        println!("Matched a:  {synonym_type:?}");
    }
    if let Some(vernacular) = &result.vernacular_name {
        println!("Common name: {vernacular}");
    }

    let lineage: Vec<String> = Rank::LINNAEAN
        .iter()
        .filter_map(|&rank| {
            result
                .classification
                .name_at(rank)
                .map(|name| format!("{}: {name}", rank.as_str()))
        })
        .collect();
    if !lineage.is_empty() {
        println!("\nClassification:");
        for line in lineage {
            println!("  {line}");
        }
    }

    if !result.species_group.is_empty() {
        println!("\nSpecies groups:    {}", result.species_group.join(", "));
    }
    if !result.species_subgroup.is_empty() {
        println!("Species subgroups: {}", result.species_subgroup.join(", "));
    }
    println!("\nIssues: {}", result.issues.join(", "));

    if let Some(trace) = &result.trace {
        println!("\nTrace:");
        for line in trace {
            println!("  {line}");
        }
    }
}

pub(crate) fn tsv_header() -> &'static str {
    "query\tsuccess\ttaxonConceptID\tscientificName\trank\tmatchType\tkingdom\tfamily\tgenus\tspeciesGroups\tissues"
}

pub(crate) fn tsv_row(query: &str, result: Option<&MatchResult>) -> String {
    let Some(result) = result else {
        return format!("{query}\t\t\t\t\t\t\t\t\t\t");
    };
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        query,
        result.success,
        result.taxon_concept_id.as_deref().unwrap_or(""),
        result.scientific_name.as_deref().unwrap_or(""),
        result.rank.map_or("", Rank::as_str),
        result.match_type.map_or("", |m| m.as_str()),
        result.classification.kingdom.as_deref().unwrap_or(""),
        result.classification.family.as_deref().unwrap_or(""),
        result.classification.genus.as_deref().unwrap_or(""),
        result.species_group.join("|"),
        result.issues.join("|"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hint() {
        assert_eq!(
            parse_hint("Family = Fabaceae").unwrap(),
            ("family".to_string(), "Fabaceae".to_string())
        );
        assert!(parse_hint("Fabaceae").is_err());
        assert!(parse_hint("family=").is_err());
    }

    #[test]
    fn test_tsv_row_for_missing_result() {
        let row = tsv_row("Acacia", None);
        assert_eq!(row.split('\t').count(), tsv_header().split('\t').count());
    }

    #[test]
    fn test_label_prefers_scientific_name() {
        assert_eq!(label(&Search::named("Acacia dealbata")), "Acacia dealbata");
        assert_eq!(label(&Search::by_id("ACA-DEA")), "ACA-DEA");
        assert_eq!(label(&Search::default()), "-");
    }
}
