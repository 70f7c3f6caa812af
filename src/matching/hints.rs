//! Post-hoc validation of a match against caller-supplied hints.
//!
//! Hints name acceptable values per rank, e.g. `kingdom: [Plantae, Fungi]`. A
//! failed check never invalidates a match; the resolver reports it as the
//! `hintMismatch` issue.

use std::collections::BTreeMap;

use crate::core::taxon::HigherClassification;

type Accessor = fn(&HigherClassification) -> Option<&str>;

fn kingdom(c: &HigherClassification) -> Option<&str> {
    c.kingdom.as_deref()
}

fn phylum(c: &HigherClassification) -> Option<&str> {
    c.phylum.as_deref()
}

fn class(c: &HigherClassification) -> Option<&str> {
    c.class.as_deref()
}

fn order(c: &HigherClassification) -> Option<&str> {
    c.order.as_deref()
}

fn family(c: &HigherClassification) -> Option<&str> {
    c.family.as_deref()
}

fn genus(c: &HigherClassification) -> Option<&str> {
    c.genus.as_deref()
}

fn species(c: &HigherClassification) -> Option<&str> {
    c.species.as_deref()
}

/// Rank names that can be hinted, with how to read each from a classification
const RANK_ACCESSORS: [(&str, Accessor); 7] = [
    ("kingdom", kingdom),
    ("phylum", phylum),
    ("class", class),
    ("order", order),
    ("family", family),
    ("genus", genus),
    ("species", species),
];

/// Value of a candidate at a named rank; unknown rank names have no value
#[must_use]
pub fn rank_value<'a>(candidate: &'a HigherClassification, rank: &str) -> Option<&'a str> {
    RANK_ACCESSORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(rank.trim()))
        .and_then(|(_, accessor)| accessor(candidate))
}

/// Whether a candidate is consistent with every hint it can be checked against
#[must_use]
pub fn check(candidate: &HigherClassification, hints: &BTreeMap<String, Vec<String>>) -> bool {
    hints.iter().all(|(rank, allowed)| {
        let Some(value) = rank_value(candidate, rank) else {
            return true;
        };
        if allowed.is_empty() {
            return true;
        }
        let value = value.to_lowercase();
        allowed.iter().any(|a| a.to_lowercase() == value)
    })
}
