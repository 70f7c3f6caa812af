//! Canonical-name derivation for scientific names.
//!
//! Reduces a verbatim name such as `Acacia cf. dealbata Link` to the bare
//! genus and epithets (`Acacia dealbata`), recording what had to be removed.

use std::collections::BTreeSet;

use crate::matching::classifier::InternalIssue;

/// A scientific name reduced to genus and lowercase epithets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub canonical: String,
    pub issues: BTreeSet<InternalIssue>,
}

impl ParsedName {
    /// Whether the name only identifies a genus (e.g. `Acacia sp.`)
    #[must_use]
    pub fn is_indeterminate(&self) -> bool {
        self.issues.contains(&InternalIssue::IndeterminateSpecies)
    }
}

const RANK_MARKERS: &[&str] = &[
    "subsp.", "subsp", "ssp.", "ssp", "var.", "var", "f.", "forma", "subvar.", "nothosubsp.",
    "nothovar.",
];

/// Lowercase particles that only occur inside author citations
const AUTHOR_PARTICLES: &[&str] = &["ex", "et", "in", "de", "van", "von", "der", "da", "emend."];

/// Endings equated when comparing epithets loosely, longest first
const EPITHET_ENDINGS: &[&str] = &["ii", "um", "us", "is", "a", "e", "i"];

/// Derive the canonical form of a scientific name
#[must_use]
pub fn parse(name: &str) -> ParsedName {
    let mut issues = BTreeSet::new();
    let mut parts: Vec<String> = Vec::new();

    for (position, raw) in name.split_whitespace().enumerate() {
        let mut token = raw;
        if token.ends_with('?') {
            issues.insert(InternalIssue::QuestionSpecies);
            token = token.trim_end_matches('?');
            if token.is_empty() {
                continue;
            }
        }
        let lower = token.to_lowercase();

        if position == 0 {
            parts.push(token.to_string());
            continue;
        }

        match lower.as_str() {
            "sp." | "sp" | "spp." | "spp" | "sp.nov." => {
                // Anything after the marker is phrase-name text
                issues.insert(InternalIssue::IndeterminateSpecies);
                break;
            }
            "cf." | "cf" => {
                issues.insert(InternalIssue::ConferSpecies);
            }
            "aff." | "aff" => {
                issues.insert(InternalIssue::AffinitySpecies);
            }
            "x" => parts.push("x".to_string()),
            m if RANK_MARKERS.contains(&m) => {
                issues.insert(InternalIssue::RemovedRankMarker);
            }
            _ if is_author_token(token) => {
                issues.insert(InternalIssue::RemovedAuthorship);
            }
            _ => parts.push(token.to_lowercase()),
        }
    }

    ParsedName {
        canonical: parts.join(" "),
        issues,
    }
}

fn is_author_token(token: &str) -> bool {
    let lower = token.to_lowercase();
    token.chars().next().is_some_and(char::is_uppercase)
        || token.contains(['(', ')', '.', '&', ',', '\''])
        || token.chars().any(|c| c.is_ascii_digit())
        || AUTHOR_PARTICLES.contains(&lower.as_str())
}

/// Strip a Latin gender ending from an epithet so `alba`, `albus` and
/// `album` compare equal
#[must_use]
pub fn stem_epithet(epithet: &str) -> &str {
    EPITHET_ENDINGS
        .iter()
        .find_map(|ending| {
            epithet
                .strip_suffix(*ending)
                .filter(|stem| stem.chars().count() >= 3)
        })
        .unwrap_or(epithet)
}

/// Key equating names that differ only in epithet endings
#[must_use]
pub fn fuzzy_key(canonical: &str) -> String {
    let mut words = canonical.split_whitespace();
    let mut key = words.next().unwrap_or_default().to_lowercase();
    for word in words {
        key.push(' ');
        key.push_str(stem_epithet(&word.to_lowercase()));
    }
    key
}
