//! Resolve declarative species-group definitions into interval groups.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::Rank;
use crate::groups::{GroupInterval, SpeciesGroup, SpeciesGroups};
use crate::matching::classifier::{Classification, Classifier, MatchOptions};

#[derive(Error, Debug)]
pub enum GroupError {
    #[error("Failed to read species groups: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse species groups: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Unknown rank '{rank}' for species group '{group}'")]
    UnknownRank { group: String, rank: String },
}

/// A species group as configured: taxon names to include and to carve out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub name: String,
    pub rank: String,
    #[serde(default)]
    pub included: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// The species-group definitions compiled into the binary
///
/// # Errors
///
/// Returns `GroupError::ParseError` if the embedded definitions are malformed.
pub fn embedded_definitions() -> Result<Vec<GroupDefinition>, GroupError> {
    // Validated at compile time by build.rs
    const EMBEDDED_GROUPS: &str = include_str!("../../taxonomy/species_groups.json");
    Ok(serde_json::from_str(EMBEDDED_GROUPS)?)
}

/// Load species-group definitions from a JSON file
///
/// # Errors
///
/// Returns `GroupError` if the file cannot be read or parsed.
pub fn load_definitions(path: &Path) -> Result<Vec<GroupDefinition>, GroupError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Resolve every definition's taxon names to tree intervals.
///
/// Exclusions are emitted before inclusions. A name the classifier cannot
/// resolve becomes an empty interval and a warning, so one bad entry does not
/// prevent the others from loading.
///
/// # Errors
///
/// Returns `GroupError::UnknownRank` if a definition names an unknown rank.
pub fn build(
    definitions: &[GroupDefinition],
    classifier: &dyn Classifier,
) -> Result<SpeciesGroups, GroupError> {
    let mut groups = Vec::with_capacity(definitions.len());

    for definition in definitions {
        let rank = Rank::parse(&definition.rank).ok_or_else(|| GroupError::UnknownRank {
            group: definition.name.clone(),
            rank: definition.rank.clone(),
        })?;

        let intervals = definition
            .excluded
            .iter()
            .map(|name| (name, false))
            .chain(definition.included.iter().map(|name| (name, true)))
            .map(|(name, included)| resolve_interval(&definition.name, name, included, classifier))
            .collect();

        let mut group = SpeciesGroup::new(&definition.name, rank, intervals);
        group.parent.clone_from(&definition.parent);
        groups.push(group);
    }

    debug!("Built {} species groups", groups.len());
    Ok(SpeciesGroups::new(groups))
}

fn resolve_interval(
    group: &str,
    name: &str,
    included: bool,
    classifier: &dyn Classifier,
) -> GroupInterval {
    let query = Classification::named(name, None);
    let found = match classifier.search(&query, &MatchOptions::strict()) {
        Ok(m) if m.valid => m.left.zip(m.right),
        Ok(_) => None,
        Err(e) => {
            warn!("Species group '{group}': lookup of '{name}' failed: {e}");
            None
        }
    };

    if let Some((left, right)) = found {
        GroupInterval::new(left, right, included)
    } else {
        warn!("Species group '{group}': could not resolve '{name}'");
        GroupInterval::new(0, 0, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::search::LocationSearch;
    use crate::core::taxon::TaxonConcept;
    use crate::matching::classifier::{
        AutocompleteEntry, ClassifierError, ClassifierMatch, MatchEvidence,
    };

    /// Knows two nested taxa by name
    struct TwoTaxa;

    impl Classifier for TwoTaxa {
        fn search(
            &self,
            classification: &Classification,
            _options: &MatchOptions,
        ) -> Result<ClassifierMatch, ClassifierError> {
            let concept = match classification.scientific_name.as_deref() {
                Some("Aves") => TaxonConcept::new("A", "Aves", Rank::Class).with_position(100, 400),
                Some("Passeriformes") => {
                    TaxonConcept::new("P", "Passeriformes", Rank::Order).with_position(150, 250)
                }
                Some("Broken") => return Err(ClassifierError::Index("down".to_string())),
                _ => return Ok(ClassifierMatch::invalid()),
            };
            Ok(ClassifierMatch::found(concept, None, MatchEvidence::Exact))
        }

        fn search_by_id(&self, _id: &str) -> Result<ClassifierMatch, ClassifierError> {
            Ok(ClassifierMatch::invalid())
        }

        fn search_vernacular(
            &self,
            _name: &str,
            _options: &MatchOptions,
        ) -> Result<ClassifierMatch, ClassifierError> {
            Ok(ClassifierMatch::invalid())
        }

        fn check_location(&self, _location: &LocationSearch) -> Result<(), ClassifierError> {
            Ok(())
        }

        fn check(&self, _name: &str, _rank: Option<Rank>) -> Result<Option<bool>, ClassifierError> {
            Ok(None)
        }

        fn autocomplete(
            &self,
            _prefix: &str,
            _max: usize,
            _include_synonyms: bool,
        ) -> Result<Vec<AutocompleteEntry>, ClassifierError> {
            Ok(Vec::new())
        }

        fn vernacular_names(&self, _taxon_id: &str, _max: usize) -> Result<Vec<String>, ClassifierError> {
            Ok(Vec::new())
        }
    }

    fn definition(name: &str, included: &[&str], excluded: &[&str]) -> GroupDefinition {
        GroupDefinition {
            name: name.to_string(),
            rank: "class".to_string(),
            included: included.iter().map(|s| (*s).to_string()).collect(),
            excluded: excluded.iter().map(|s| (*s).to_string()).collect(),
            parent: None,
        }
    }

    #[test]
    fn test_exclusions_come_first() {
        let groups = build(
            &[definition("Non-passerines", &["Aves"], &["Passeriformes"])],
            &TwoTaxa,
        )
        .unwrap();

        let group = groups.get("Non-passerines").unwrap();
        assert_eq!(
            group.intervals,
            vec![
                GroupInterval::new(150, 250, false),
                GroupInterval::new(100, 400, true),
            ]
        );
        assert!(group.is_part_of(120));
        assert!(!group.is_part_of(200));
    }

    #[test]
    fn test_unresolved_names_become_empty_intervals() {
        let groups = build(&[definition("Odd", &["Nonexistent", "Broken"], &[])], &TwoTaxa).unwrap();
        let group = groups.get("Odd").unwrap();
        assert_eq!(group.intervals.len(), 2);
        assert!(group
            .intervals
            .iter()
            .all(|i| i.left == 0 && i.right == 0 && !i.included));
        assert!(!group.is_part_of(0));
    }

    #[test]
    fn test_unknown_rank_is_an_error() {
        let mut bad = definition("Bad", &["Aves"], &[]);
        bad.rank = "clade".to_string();
        assert!(matches!(
            build(&[bad], &TwoTaxa),
            Err(GroupError::UnknownRank { .. })
        ));
    }

    #[test]
    fn test_embedded_definitions_parse() {
        let definitions = embedded_definitions().unwrap();
        assert!(!definitions.is_empty());
        assert!(definitions.iter().all(|d| Rank::parse(&d.rank).is_some()));
    }
}
