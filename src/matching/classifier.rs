//! The contract of the name-matching index the resolver drives.
//!
//! A [`Classifier`] answers a single classification query with a
//! [`ClassifierMatch`]: whether a taxon was found, which concept it matched,
//! the accepted concept behind it, the evidence used and any diagnostics. The
//! resolver decides which queries to send and in what order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::search::{LocationSearch, Search};
use crate::core::taxon::TaxonConcept;
use crate::core::types::{Rank, SearchStyle};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("Index error: {0}")]
    Index(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Classifier unavailable: {0}")]
    Unavailable(String),
}

impl ClassifierError {
    /// Short error class name, reported alongside the message in failed results
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Index(_) => "IndexError",
            Self::InvalidLocation(_) => "InvalidLocation",
            Self::InvalidQuery(_) => "InvalidQuery",
            Self::Unavailable(_) => "Unavailable",
        }
    }
}

/// How much of the matching process the classifier should record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    #[default]
    Off,
    Summary,
    Full,
}

/// Options controlling which derivations a classifier may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub fuzzy_derivations: bool,
    pub canonical_derivations: bool,
    pub modify_consistency: bool,
    pub use_hints: bool,
    pub higher_order: bool,
    pub trace: TraceLevel,
    pub measure: bool,
}

impl MatchOptions {
    /// Exact and canonical matching only, no hints
    #[must_use]
    pub fn strict() -> Self {
        Self {
            fuzzy_derivations: false,
            canonical_derivations: true,
            modify_consistency: false,
            use_hints: false,
            higher_order: false,
            trace: TraceLevel::Off,
            measure: false,
        }
    }

    /// Options relaxed as far as a search style allows
    #[must_use]
    pub fn for_style(style: SearchStyle) -> Self {
        match style {
            SearchStyle::Strict => Self::strict(),
            SearchStyle::Fuzzy => Self {
                fuzzy_derivations: true,
                modify_consistency: true,
                ..Self::strict()
            },
            SearchStyle::Match => Self {
                fuzzy_derivations: true,
                modify_consistency: true,
                higher_order: true,
                ..Self::strict()
            },
        }
    }

    #[must_use]
    pub fn with_hints(mut self, use_hints: bool) -> Self {
        self.use_hints = use_hints;
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace: TraceLevel) -> Self {
        self.trace = trace;
        self
    }

    #[must_use]
    pub fn with_measure(mut self, measure: bool) -> Self {
        self.measure = measure;
        self
    }
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::for_style(SearchStyle::default())
    }
}

/// Internal diagnostic codes a classifier may raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InternalIssue {
    Homonym,
    /// Several accepted concepts share the name and nothing disambiguated them
    UnresolvedHomonym,
    MisappliedName,
    ExcludedName,
    ParentChildSynonym,
    IndeterminateSpecies,
    AffinitySpecies,
    ConferSpecies,
    QuestionSpecies,
    RemovedAuthorship,
    RemovedRankMarker,
    RemovedQualifier,
    ConflictingClassification,
}

/// Evidence describing how a name was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchEvidence {
    TaxonId,
    Exact,
    Canonical,
    Phrase,
    Fuzzy,
    SoundsLike,
    Vernacular,
    HigherOrder,
    Recursive,
}

/// A partially filled classification sent to the classifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub specific_epithet: Option<String>,
    pub infraspecific_epithet: Option<String>,
    pub scientific_name: Option<String>,
    pub authorship: Option<String>,
    pub rank: Option<Rank>,
    pub hints: BTreeMap<String, Vec<String>>,
}

impl Classification {
    /// Build a classification from the name and rank fields of a search
    #[must_use]
    pub fn from_search(search: &Search, with_hints: bool) -> Self {
        Self {
            kingdom: search.kingdom.clone(),
            phylum: search.phylum.clone(),
            class: search.class.clone(),
            order: search.order.clone(),
            family: search.family.clone(),
            genus: search.genus.clone(),
            specific_epithet: search.specific_epithet.clone(),
            infraspecific_epithet: search.infraspecific_epithet.clone(),
            scientific_name: search.scientific_name.clone(),
            authorship: search.scientific_name_authorship.clone(),
            rank: search.rank.as_deref().and_then(Rank::parse),
            hints: if with_hints {
                search.hints.clone()
            } else {
                BTreeMap::new()
            },
        }
    }

    /// A classification carrying only a name and an expected rank
    pub fn named(name: impl Into<String>, rank: Option<Rank>) -> Self {
        Self {
            scientific_name: Some(name.into()),
            rank,
            ..Self::default()
        }
    }

    /// Name supplied at a Linnaean rank
    #[must_use]
    pub fn name_at(&self, rank: Rank) -> Option<&str> {
        match rank {
            Rank::Kingdom => self.kingdom.as_deref(),
            Rank::Phylum => self.phylum.as_deref(),
            Rank::Class => self.class.as_deref(),
            Rank::Order => self.order.as_deref(),
            Rank::Family => self.family.as_deref(),
            Rank::Genus => self.genus.as_deref(),
            _ => None,
        }
    }

    /// The name to look up: the scientific name, or one assembled from the
    /// genus and epithets, or failing that the most specific rank supplied
    #[must_use]
    pub fn query_name(&self) -> Option<String> {
        if let Some(name) = self.scientific_name.as_deref().filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }
        if let (Some(genus), Some(epithet)) = (&self.genus, &self.specific_epithet) {
            let mut name = format!("{genus} {epithet}");
            if let Some(infra) = &self.infraspecific_epithet {
                name.push(' ');
                name.push_str(infra);
            }
            return Some(name);
        }
        Rank::LINNAEAN
            .iter()
            .rev()
            .find_map(|&rank| self.name_at(rank))
            .map(str::to_string)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query_name().is_none()
    }
}

/// A classifier's verdict on one query
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierMatch {
    pub valid: bool,
    pub issues: BTreeSet<InternalIssue>,
    pub evidence: BTreeSet<MatchEvidence>,
    /// The concept whose name matched
    pub matched: Option<TaxonConcept>,
    /// The accepted concept behind the match, when the matched name is a synonym
    pub accepted: Option<TaxonConcept>,
    pub left: Option<u32>,
    pub right: Option<u32>,
    pub probability: Option<f64>,
    pub fidelity: Option<f64>,
    pub trace: Vec<String>,
}

impl ClassifierMatch {
    /// No match
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            valid: false,
            issues: BTreeSet::new(),
            evidence: BTreeSet::new(),
            matched: None,
            accepted: None,
            left: None,
            right: None,
            probability: None,
            fidelity: None,
            trace: Vec::new(),
        }
    }

    /// A valid match; position is taken from the accepted concept
    #[must_use]
    pub fn found(matched: TaxonConcept, accepted: Option<TaxonConcept>, evidence: MatchEvidence) -> Self {
        let position = accepted.as_ref().unwrap_or(&matched);
        let (left, right) = (position.left, position.right);
        let mut result = Self::invalid();
        result.valid = true;
        result.left = left;
        result.right = right;
        result.evidence.insert(evidence);
        result.matched = Some(matched);
        result.accepted = accepted;
        result
    }

    #[must_use]
    pub fn with_issue(mut self, issue: InternalIssue) -> Self {
        self.issues.insert(issue);
        self
    }

    /// Worth stopping the search for: a valid match, or an ambiguity the caller should see
    #[must_use]
    pub fn is_possible_match(&self) -> bool {
        self.valid || self.issues.contains(&InternalIssue::UnresolvedHomonym)
    }

    /// The concept the response describes: accepted if known, otherwise the matched one
    #[must_use]
    pub fn accepted_concept(&self) -> Option<&TaxonConcept> {
        self.accepted.as_ref().or(self.matched.as_ref())
    }
}

/// An autocomplete suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutocompleteEntry {
    pub name: String,
    #[serde(rename = "taxonID")]
    pub taxon_id: String,
    pub rank: Rank,
    pub synonym: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vernacular_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<u32>,
}

/// A name-matching index.
///
/// Implementations are expected to be blocking and possibly I/O bound; callers
/// should not assume a call is cheap.
pub trait Classifier: Send + Sync {
    /// Match a classification
    ///
    /// # Errors
    ///
    /// Returns a `ClassifierError` if the index cannot answer the query.
    fn search(
        &self,
        classification: &Classification,
        options: &MatchOptions,
    ) -> Result<ClassifierMatch, ClassifierError>;

    /// Look up a taxon by identifier
    ///
    /// # Errors
    ///
    /// Returns a `ClassifierError` if the index cannot answer the query.
    fn search_by_id(&self, id: &str) -> Result<ClassifierMatch, ClassifierError>;

    /// Match a vernacular name
    ///
    /// # Errors
    ///
    /// Returns a `ClassifierError` if the index cannot answer the query.
    fn search_vernacular(
        &self,
        name: &str,
        options: &MatchOptions,
    ) -> Result<ClassifierMatch, ClassifierError>;

    /// Resolve a location sub-search
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::InvalidLocation` if the location cannot be resolved.
    fn check_location(&self, location: &LocationSearch) -> Result<(), ClassifierError>;

    /// Whether a name is known at a rank: `Some(true)`, known at another rank:
    /// `Some(false)`, unknown: `None`
    ///
    /// # Errors
    ///
    /// Returns a `ClassifierError` if the index cannot answer the query.
    fn check(&self, name: &str, rank: Option<Rank>) -> Result<Option<bool>, ClassifierError>;

    /// Names (and vernacular names) starting with a prefix
    ///
    /// # Errors
    ///
    /// Returns a `ClassifierError` if the index cannot answer the query.
    fn autocomplete(
        &self,
        prefix: &str,
        max: usize,
        include_synonyms: bool,
    ) -> Result<Vec<AutocompleteEntry>, ClassifierError>;

    /// Vernacular names recorded for a taxon
    ///
    /// # Errors
    ///
    /// Returns a `ClassifierError` if the index cannot answer the query.
    fn vernacular_names(&self, taxon_id: &str, max: usize) -> Result<Vec<String>, ClassifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_for_style() {
        let strict = MatchOptions::for_style(SearchStyle::Strict);
        assert!(!strict.fuzzy_derivations && !strict.higher_order);
        assert!(strict.canonical_derivations);

        let fuzzy = MatchOptions::for_style(SearchStyle::Fuzzy);
        assert!(fuzzy.fuzzy_derivations && !fuzzy.higher_order);

        let relaxed = MatchOptions::for_style(SearchStyle::Match);
        assert!(relaxed.fuzzy_derivations && relaxed.higher_order);
        assert!(!relaxed.use_hints);
        assert!(relaxed.with_hints(true).use_hints);
    }

    #[test]
    fn test_query_name_fallbacks() {
        let c = Classification::named("Acacia dealbata", None);
        assert_eq!(c.query_name().as_deref(), Some("Acacia dealbata"));

        let c = Classification {
            genus: Some("Acacia".to_string()),
            specific_epithet: Some("dealbata".to_string()),
            infraspecific_epithet: Some("subalpina".to_string()),
            ..Classification::default()
        };
        assert_eq!(c.query_name().as_deref(), Some("Acacia dealbata subalpina"));

        let c = Classification {
            kingdom: Some("Plantae".to_string()),
            family: Some("Fabaceae".to_string()),
            ..Classification::default()
        };
        assert_eq!(c.query_name().as_deref(), Some("Fabaceae"));
        assert!(Classification::default().is_empty());
    }

    #[test]
    fn test_from_search_hints_toggle() {
        let search = Search::named("Acacia").with_hint("kingdom", ["Plantae"]);
        assert!(Classification::from_search(&search, false).hints.is_empty());
        assert_eq!(Classification::from_search(&search, true).hints.len(), 1);
    }

    #[test]
    fn test_possible_match() {
        assert!(!ClassifierMatch::invalid().is_possible_match());
        let ambiguous = ClassifierMatch::invalid()
            .with_issue(InternalIssue::Homonym)
            .with_issue(InternalIssue::UnresolvedHomonym);
        assert!(ambiguous.is_possible_match());

        let concept = TaxonConcept::new("T1", "Acacia", Rank::Genus).with_position(10, 20);
        let found = ClassifierMatch::found(concept, None, MatchEvidence::Exact);
        assert!(found.is_possible_match());
        assert_eq!(found.left, Some(10));
        assert_eq!(found.accepted_concept().map(|c| c.taxon_id.as_str()), Some("T1"));
    }
}
