//! Classification of classifier diagnostics into the public issue vocabulary.
//!
//! Internal issue codes map to at most one public issue string; codes with no
//! public counterpart are dropped. Match evidence maps to a [`MatchType`]
//! label, the least certain label winning when several apply.

use std::collections::BTreeSet;

use crate::core::types::MatchType;
use crate::matching::classifier::{InternalIssue, MatchEvidence};

pub const NO_ISSUE: &str = "noIssue";
pub const NO_MATCH: &str = "noMatch";
pub const HOMONYM: &str = "homonym";
pub const HINT_MISMATCH: &str = "hintMismatch";
pub const MISAPPLIED_NAME: &str = "misappliedName";
pub const INVALID_LOCATION: &str = "invalidLocation";
pub const EXCLUDED: &str = "excluded";
pub const INDETERMINATE_SPECIES: &str = "indeterminateSpecies";
pub const AFFINITY_SPECIES: &str = "affinitySpecies";
pub const CONFER_SPECIES: &str = "conferSpecies";
pub const QUESTION_SPECIES: &str = "questionSpecies";
pub const PARENT_CHILD_SYNONYM: &str = "parentChildSynonym";
pub const GENERIC_ERROR: &str = "genericError";

/// Public issue for an internal code, `None` for classifier chatter
#[must_use]
pub fn public_issue(issue: InternalIssue) -> Option<&'static str> {
    match issue {
        InternalIssue::Homonym | InternalIssue::UnresolvedHomonym => Some(HOMONYM),
        InternalIssue::MisappliedName => Some(MISAPPLIED_NAME),
        InternalIssue::ExcludedName => Some(EXCLUDED),
        InternalIssue::ParentChildSynonym => Some(PARENT_CHILD_SYNONYM),
        InternalIssue::IndeterminateSpecies => Some(INDETERMINATE_SPECIES),
        InternalIssue::AffinitySpecies => Some(AFFINITY_SPECIES),
        InternalIssue::ConferSpecies => Some(CONFER_SPECIES),
        InternalIssue::QuestionSpecies => Some(QUESTION_SPECIES),
        InternalIssue::RemovedAuthorship
        | InternalIssue::RemovedRankMarker
        | InternalIssue::RemovedQualifier
        | InternalIssue::ConflictingClassification => None,
    }
}

/// Map internal codes to sorted, de-duplicated public issues.
///
/// The result may be empty; callers substitute [`NO_ISSUE`] or [`NO_MATCH`].
#[must_use]
pub fn classify(issues: &BTreeSet<InternalIssue>) -> Vec<String> {
    let public: BTreeSet<&str> = issues.iter().filter_map(|&i| public_issue(i)).collect();
    public.into_iter().map(str::to_string).collect()
}

/// Sort and de-duplicate an issue list, substituting the sentinel when empty
#[must_use]
pub fn finalize(issues: Vec<String>, success: bool) -> Vec<String> {
    let mut issues: Vec<String> = issues
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if issues.is_empty() {
        issues.push(if success { NO_ISSUE } else { NO_MATCH }.to_string());
    }
    issues
}

/// Label for a single piece of evidence
#[must_use]
pub fn evidence_label(evidence: MatchEvidence) -> MatchType {
    match evidence {
        MatchEvidence::TaxonId => MatchType::TaxonId,
        MatchEvidence::Exact => MatchType::Exact,
        MatchEvidence::Canonical => MatchType::Canonical,
        MatchEvidence::Phrase => MatchType::Phrase,
        MatchEvidence::Fuzzy | MatchEvidence::SoundsLike => MatchType::Fuzzy,
        MatchEvidence::Vernacular => MatchType::Vernacular,
        MatchEvidence::HigherOrder | MatchEvidence::Recursive => MatchType::HigherOrder,
    }
}

/// The highest-precedence label among all evidence, `None` without evidence
#[must_use]
pub fn match_type(evidence: &BTreeSet<MatchEvidence>) -> Option<MatchType> {
    evidence.iter().map(|&e| evidence_label(e)).max()
}
