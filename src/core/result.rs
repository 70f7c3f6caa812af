use serde::{Deserialize, Serialize};

use crate::core::taxon::HigherClassification;
use crate::core::types::{MatchType, NameType, Rank, TaxonomicStatus};
use crate::matching::issues::{GENERIC_ERROR, NO_MATCH};

/// The outcome of resolving a single search or identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub success: bool,

    #[serde(rename = "taxonConceptID", default, skip_serializing_if = "Option::is_none")]
    pub taxon_concept_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name_authorship: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,

    #[serde(rename = "rankID", default, skip_serializing_if = "Option::is_none")]
    pub rank_id: Option<u32>,

    #[serde(flatten)]
    pub classification: HigherClassification,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lft: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgt: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_type: Option<NameType>,

    /// Status of the matched name when it was not the accepted concept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonym_type: Option<TaxonomicStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vernacular_name: Option<String>,

    #[serde(default)]
    pub species_group: Vec<String>,

    #[serde(default)]
    pub species_subgroup: Vec<String>,

    pub issues: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fidelity: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

impl MatchResult {
    /// An unsuccessful result carrying the given issues (`noMatch` if empty)
    #[must_use]
    pub fn failed(mut issues: Vec<String>) -> Self {
        if issues.is_empty() {
            issues.push(NO_MATCH.to_string());
        }
        Self {
            success: false,
            taxon_concept_id: None,
            scientific_name: None,
            scientific_name_authorship: None,
            rank: None,
            rank_id: None,
            classification: HigherClassification::default(),
            lft: None,
            rgt: None,
            match_type: None,
            name_type: None,
            synonym_type: None,
            vernacular_name: None,
            species_group: Vec::new(),
            species_subgroup: Vec::new(),
            issues,
            trace: None,
            fidelity: None,
            probability: None,
        }
    }

    /// The plain "nothing found" result
    #[must_use]
    pub fn no_match() -> Self {
        Self::failed(vec![NO_MATCH.to_string()])
    }

    /// A failed result for an unexpected internal error, keeping the error text
    #[must_use]
    pub fn error(kind: &str, message: &str) -> Self {
        Self::failed(vec![GENERIC_ERROR.to_string(), format!("{kind}: {message}")])
    }

    /// Whether the result carries a given public issue
    #[must_use]
    pub fn has_issue(&self, issue: &str) -> bool {
        self.issues.iter().any(|i| i == issue)
    }
}
