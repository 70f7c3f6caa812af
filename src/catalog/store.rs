use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::names;
use crate::core::taxon::{HigherClassification, TaxonConcept};
use crate::core::types::{NameType, Rank, TaxonomicStatus};
use crate::matching::classifier::InternalIssue;
use crate::parsing::ParseError;
use crate::utils::normalize::{Normalizer, NormalizerOptions};

#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("Failed to read taxonomy: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse taxonomy: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to parse taxon file: {0}")]
    TaxonFile(#[from] ParseError),

    #[error("Invalid taxonomy: {0}")]
    Invalid(String),
}

/// Taxonomy version for compatibility checking
pub const TAXONOMY_VERSION: &str = "1.0.0";

/// One name usage as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonRecord {
    #[serde(rename = "taxonID")]
    pub taxon_id: String,
    pub scientific_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorship: Option<String>,
    pub rank: Rank,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub status: TaxonomicStatus,
    #[serde(rename = "acceptedID", default, skip_serializing_if = "Option::is_none")]
    pub accepted_id: Option<String>,
    #[serde(default)]
    pub name_type: NameType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vernacular_names: Vec<String>,
}

/// Serializable taxonomy format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyData {
    pub version: String,
    pub created_at: String,
    pub taxa: Vec<TaxonRecord>,
    /// Known place names; locations are only checked when this is non-empty
    #[serde(default)]
    pub areas: Vec<String>,
}

/// An in-memory taxonomy with name indexes, usable as a
/// [`Classifier`](crate::matching::classifier::Classifier)
#[derive(Debug)]
pub struct TaxonomyIndex {
    /// All name usages, accepted and not
    pub(crate) concepts: Vec<TaxonConcept>,

    /// Vernacular names per concept
    pub(crate) vernaculars: Vec<Vec<String>>,

    /// Index: taxon ID -> index in concepts vec
    pub(crate) id_to_index: HashMap<String, usize>,

    /// Index: normalized scientific name -> concepts using it
    pub(crate) name_to_concepts: BTreeMap<String, Vec<usize>>,

    /// Index: name with epithet endings stripped -> concepts
    pub(crate) fuzzy_to_concepts: HashMap<String, Vec<usize>>,

    /// Index: normalized vernacular name -> concepts
    pub(crate) vernacular_to_concepts: BTreeMap<String, Vec<usize>>,

    /// Normalized known areas
    pub(crate) areas: BTreeSet<String>,
    area_names: Vec<String>,

    pub(crate) normalizer: Normalizer,
}

impl TaxonomyIndex {
    /// Load the embedded sample taxonomy
    ///
    /// # Errors
    ///
    /// Returns `TaxonomyError` if the embedded taxonomy is malformed.
    pub fn load_embedded() -> Result<Self, TaxonomyError> {
        // Embedded at compile time via build.rs
        const EMBEDDED_TAXONOMY: &str = include_str!("../../taxonomy/sample_taxonomy.json");
        Self::from_json(EMBEDDED_TAXONOMY)
    }

    /// Load a taxonomy from a JSON file (optionally gzipped) or a Darwin Core
    /// taxon TSV/CSV
    ///
    /// # Errors
    ///
    /// Returns `TaxonomyError` if the file cannot be read or is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self, TaxonomyError> {
        let name = path.to_string_lossy().to_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if name.ends_with(".json") {
            Self::from_json(&crate::parsing::read_text(path)?)
        } else if [".tsv", ".txt", ".csv"].iter().any(|ext| name.ends_with(ext)) {
            let records = crate::parsing::taxa::parse_taxa_file(path)?;
            Self::from_records(records, Vec::new())
        } else {
            Err(ParseError::UnsupportedFormat(path.display().to_string()).into())
        }
    }

    /// Parse a taxonomy from a JSON string
    ///
    /// # Errors
    ///
    /// Returns `TaxonomyError` if the JSON is malformed or the taxa are inconsistent.
    pub fn from_json(json: &str) -> Result<Self, TaxonomyError> {
        let data: TaxonomyData = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != TAXONOMY_VERSION {
            warn!(
                "Taxonomy version mismatch (expected {}, found {})",
                TAXONOMY_VERSION, data.version
            );
        }

        Self::from_records(data.taxa, data.areas)
    }

    /// Build the index: number accepted taxa depth first, derive each higher
    /// classification, then index names.
    ///
    /// # Errors
    ///
    /// Returns `TaxonomyError::Invalid` for duplicate taxon identifiers.
    pub fn from_records(records: Vec<TaxonRecord>, areas: Vec<String>) -> Result<Self, TaxonomyError> {
        let mut id_to_index = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if id_to_index.insert(record.taxon_id.clone(), index).is_some() {
                return Err(TaxonomyError::Invalid(format!(
                    "duplicate taxonID '{}'",
                    record.taxon_id
                )));
            }
        }

        let mut concepts: Vec<TaxonConcept> = records
            .iter()
            .map(|record| {
                let mut concept =
                    TaxonConcept::new(&record.taxon_id, &record.scientific_name, record.rank)
                        .with_status(record.status, record.accepted_id.clone());
                concept.authorship.clone_from(&record.authorship);
                concept.parent_id.clone_from(&record.parent_id);
                concept.name_type = record.name_type;
                concept.vernacular_name = record.vernacular_names.first().cloned();
                concept
            })
            .collect();

        number_tree(&mut concepts, &id_to_index);
        classify_tree(&mut concepts, &id_to_index);

        let normalizer = Normalizer::new(NormalizerOptions::all());
        let mut name_to_concepts: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut fuzzy_to_concepts: HashMap<String, Vec<usize>> = HashMap::new();
        let mut vernacular_to_concepts: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        for (index, record) in records.iter().enumerate() {
            let key = normalizer.normalize_str(&record.scientific_name);
            let parsed = names::parse(&record.scientific_name);
            let canonical = normalizer.normalize_str(&parsed.canonical);
            fuzzy_to_concepts
                .entry(names::fuzzy_key(&canonical))
                .or_default()
                .push(index);
            // Infraspecific names are also found without their rank marker
            if canonical != key
                && !canonical.is_empty()
                && parsed
                    .issues
                    .iter()
                    .all(|issue| *issue == InternalIssue::RemovedRankMarker)
            {
                name_to_concepts.entry(canonical).or_default().push(index);
            }
            name_to_concepts.entry(key).or_default().push(index);

            for vernacular in &record.vernacular_names {
                vernacular_to_concepts
                    .entry(normalizer.normalize_str(vernacular))
                    .or_default()
                    .push(index);
            }
        }

        let vernaculars = records.into_iter().map(|r| r.vernacular_names).collect();

        debug!(
            "Indexed {} taxa, {} distinct names, {} vernacular names",
            concepts.len(),
            name_to_concepts.len(),
            vernacular_to_concepts.len()
        );

        Ok(Self {
            concepts,
            vernaculars,
            id_to_index,
            name_to_concepts,
            fuzzy_to_concepts,
            vernacular_to_concepts,
            areas: areas.iter().map(|a| normalizer.normalize_str(a)).collect(),
            area_names: areas,
            normalizer,
        })
    }

    /// Export the taxonomy to JSON
    ///
    /// # Errors
    ///
    /// Returns `TaxonomyError::ParseError` if serialization fails.
    pub fn to_json(&self) -> Result<String, TaxonomyError> {
        let taxa = self
            .concepts
            .iter()
            .zip(&self.vernaculars)
            .map(|(concept, vernacular_names)| TaxonRecord {
                taxon_id: concept.taxon_id.clone(),
                scientific_name: concept.scientific_name.clone(),
                authorship: concept.authorship.clone(),
                rank: concept.rank,
                parent_id: concept.parent_id.clone(),
                status: concept.status,
                accepted_id: concept.accepted_id.clone(),
                name_type: concept.name_type,
                vernacular_names: vernacular_names.clone(),
            })
            .collect();

        let data = TaxonomyData {
            version: TAXONOMY_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            taxa,
            areas: self.area_names.clone(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Get a concept by taxon ID
    #[must_use]
    pub fn get(&self, taxon_id: &str) -> Option<&TaxonConcept> {
        self.id_to_index.get(taxon_id).map(|&idx| &self.concepts[idx])
    }

    /// All concepts, in load order
    pub fn concepts(&self) -> impl Iterator<Item = &TaxonConcept> {
        self.concepts.iter()
    }

    /// Number of name usages in the taxonomy
    #[must_use]
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    /// Check if taxonomy is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Index of the accepted concept behind a usage, the usage itself when it
    /// is accepted or its target is unknown
    pub(crate) fn accepted_index(&self, index: usize) -> usize {
        let concept = &self.concepts[index];
        if !concept.is_synonym() {
            return index;
        }
        concept
            .accepted_id
            .as_ref()
            .and_then(|id| self.id_to_index.get(id))
            .copied()
            .unwrap_or(index)
    }
}

/// Whether a usage takes part in the tree (synonyms hang off their accepted concept)
fn in_tree(concept: &TaxonConcept) -> bool {
    !concept.is_synonym()
}

/// Assign nested-set positions by depth-first traversal, children in name order.
///
/// A taxon at `left` with descendants numbered up to `right - 1` owns
/// `[left, right)`.
fn number_tree(concepts: &mut [TaxonConcept], id_to_index: &HashMap<String, usize>) {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); concepts.len()];
    let mut roots = Vec::new();

    for (index, concept) in concepts.iter().enumerate() {
        if !in_tree(concept) {
            continue;
        }
        match concept.parent_id.as_ref().and_then(|p| id_to_index.get(p)) {
            Some(&parent) if in_tree(&concepts[parent]) => children[parent].push(index),
            Some(_) => {
                warn!(
                    "Taxon '{}' has a synonym as parent; treating it as a root",
                    concept.taxon_id
                );
                roots.push(index);
            }
            None => {
                if let Some(parent) = &concept.parent_id {
                    warn!("Taxon '{}' has unknown parent '{parent}'", concept.taxon_id);
                }
                roots.push(index);
            }
        }
    }

    let by_name = |a: &usize, b: &usize| {
        concepts[*a]
            .scientific_name
            .cmp(&concepts[*b].scientific_name)
    };
    roots.sort_by(by_name);
    for list in &mut children {
        list.sort_by(by_name);
    }

    let mut positions: Vec<Option<(u32, u32)>> = vec![None; concepts.len()];
    let mut lefts: Vec<u32> = vec![0; concepts.len()];
    let mut visited = HashSet::new();
    let mut counter: u32 = 1;
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();

    while let Some((index, finished)) = stack.pop() {
        if finished {
            positions[index] = Some((lefts[index], counter));
            continue;
        }
        if !visited.insert(index) {
            continue;
        }
        lefts[index] = counter;
        counter += 1;
        stack.push((index, true));
        stack.extend(children[index].iter().rev().map(|&c| (c, false)));
    }

    for (concept, position) in concepts.iter_mut().zip(positions) {
        if let Some((left, right)) = position {
            concept.left = Some(left);
            concept.right = Some(right);
        }
    }
}

/// Fill the higher classification of every usage from its ancestors; a
/// synonym takes the classification of its accepted concept
fn classify_tree(concepts: &mut [TaxonConcept], id_to_index: &HashMap<String, usize>) {
    let lineage_of = |start: usize| {
        let mut hc = HigherClassification::default();
        let mut current = Some(start);
        let mut steps = 0;
        while let Some(index) = current {
            let concept = &concepts[index];
            if hc.name_at(concept.rank).is_none() {
                hc.set(concept.rank, &concept.scientific_name, &concept.taxon_id);
            }
            steps += 1;
            if steps > concepts.len() {
                warn!("Cycle in parent chain of '{}'", concepts[start].taxon_id);
                break;
            }
            current = concept
                .parent_id
                .as_ref()
                .and_then(|p| id_to_index.get(p))
                .copied();
        }
        hc
    };

    let classifications: Vec<HigherClassification> = (0..concepts.len())
        .map(|index| {
            let concept = &concepts[index];
            let source = if concept.is_synonym() {
                concept
                    .accepted_id
                    .as_ref()
                    .and_then(|id| id_to_index.get(id))
                    .copied()
                    .unwrap_or(index)
            } else {
                index
            };
            lineage_of(source)
        })
        .collect();

    for (concept, classification) in concepts.iter_mut().zip(classifications) {
        concept.classification = classification;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, rank: Rank, parent: Option<&str>) -> TaxonRecord {
        TaxonRecord {
            taxon_id: id.to_string(),
            scientific_name: name.to_string(),
            authorship: None,
            rank,
            parent_id: parent.map(str::to_string),
            status: TaxonomicStatus::Accepted,
            accepted_id: None,
            name_type: NameType::Scientific,
            vernacular_names: Vec::new(),
        }
    }

    fn small_tree() -> TaxonomyIndex {
        let mut synonym = record("SYN", "Racosperma dealbatum", Rank::Species, None);
        synonym.status = TaxonomicStatus::Synonym;
        synonym.accepted_id = Some("S1".to_string());

        TaxonomyIndex::from_records(
            vec![
                record("K", "Plantae", Rank::Kingdom, None),
                record("F", "Fabaceae", Rank::Family, Some("K")),
                record("G", "Acacia", Rank::Genus, Some("F")),
                record("S2", "Acacia melanoxylon", Rank::Species, Some("G")),
                record("S1", "Acacia dealbata", Rank::Species, Some("G")),
                synonym,
            ],
            vec!["Australia".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_load_embedded_taxonomy() {
        let index = TaxonomyIndex::load_embedded().unwrap();
        assert!(!index.is_empty());
        assert!(index.get("ACA-DEA").is_some());
    }

    #[test]
    fn test_nested_set_numbering() {
        let index = small_tree();
        let position = |id: &str| {
            let c = index.get(id).unwrap();
            (c.left.unwrap(), c.right.unwrap())
        };

        assert_eq!(position("K"), (1, 6));
        assert_eq!(position("F"), (2, 6));
        assert_eq!(position("G"), (3, 6));
        // Children are numbered in name order
        assert_eq!(position("S1"), (4, 5));
        assert_eq!(position("S2"), (5, 6));
        assert!(index.get("SYN").unwrap().left.is_none());
    }

    #[test]
    fn test_higher_classification() {
        let index = small_tree();
        let hc = &index.get("S1").unwrap().classification;
        assert_eq!(hc.kingdom.as_deref(), Some("Plantae"));
        assert_eq!(hc.genus_id.as_deref(), Some("G"));
        assert_eq!(hc.species.as_deref(), Some("Acacia dealbata"));

        // Synonyms borrow the accepted classification
        let syn = &index.get("SYN").unwrap().classification;
        assert_eq!(syn.species.as_deref(), Some("Acacia dealbata"));
        assert_eq!(index.accepted_index(index.id_to_index["SYN"]), index.id_to_index["S1"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = TaxonomyIndex::from_records(
            vec![
                record("K", "Plantae", Rank::Kingdom, None),
                record("K", "Animalia", Rank::Kingdom, None),
            ],
            Vec::new(),
        );
        assert!(matches!(result, Err(TaxonomyError::Invalid(_))));
    }

    #[test]
    fn test_json_roundtrip_keeps_taxa() {
        let index = small_tree();
        let reloaded = TaxonomyIndex::from_json(&index.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.len(), index.len());
        assert_eq!(
            reloaded.get("S1").unwrap().left,
            index.get("S1").unwrap().left
        );
    }

    #[test]
    fn test_load_taxon_tsv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxa.tsv");
        std::fs::write(
            &path,
            "taxonID\tparentNameUsageID\tscientificName\ttaxonRank\n\
             G\t\tAcacia\tgenus\n\
             S\tG\tAcacia dealbata\tspecies\n",
        )
        .unwrap();

        let index = TaxonomyIndex::load_from_file(&path).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("S").unwrap().left, Some(2));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = TaxonomyIndex::load_from_file(Path::new("taxa.xlsx"));
        assert!(matches!(
            result,
            Err(TaxonomyError::TaxonFile(ParseError::UnsupportedFormat(_)))
        ));
    }
}
