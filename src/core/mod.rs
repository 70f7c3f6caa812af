//! Core data types for taxon name resolution.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`Search`]: A partial classification (names, ranks, identifiers, hints) to resolve
//! - [`MatchResult`]: The resolved taxon, or a failure with diagnostic issues
//! - [`TaxonConcept`], [`HigherClassification`]: Taxa as reported by a classifier
//! - [`Rank`], [`SearchStyle`], [`TaxonomicStatus`], [`NameType`], [`MatchType`]:
//!   Classification and result labels
//!
//! ## Ranks
//!
//! | Rank    | Rank ID | Example       |
//! |---------|---------|---------------|
//! | kingdom | 1000    | Plantae       |
//! | family  | 5000    | Fabaceae      |
//! | genus   | 6000    | Acacia        |
//! | species | 7000    | Acacia dealbata |
//!
//! Searches are compared structurally, so a normalized search doubles as the key
//! of the result cache.
//!
//! [`Search`]: search::Search
//! [`MatchResult`]: result::MatchResult
//! [`TaxonConcept`]: taxon::TaxonConcept
//! [`HigherClassification`]: taxon::HigherClassification
//! [`Rank`]: types::Rank
//! [`SearchStyle`]: types::SearchStyle
//! [`TaxonomicStatus`]: types::TaxonomicStatus
//! [`NameType`]: types::NameType
//! [`MatchType`]: types::MatchType

pub mod result;
pub mod search;
pub mod taxon;
pub mod types;
