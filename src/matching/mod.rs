//! Name matching: the classifier contract and the resolution engine around it.
//!
//! - [`Classifier`]: the name-matching index the engine queries
//! - [`MatchingEngine`]: resolves a [`Search`](crate::core::search::Search) to a
//!   single [`MatchResult`](crate::core::result::MatchResult)
//! - [`hints`]: post-hoc validation of a match against caller hints
//! - [`issues`]: the public issue and match-type vocabulary
//!
//! ## Matching Algorithm
//!
//! The engine tries strategies in order and stops at the first that yields a
//! possible match:
//!
//! 1. **Identifier**: taxon concept or taxon identifier lookup
//! 2. **Hinted strict**: exact and canonical derivations, hints applied
//! 3. **Strict**: the same without hints
//! 4. **Relaxed**: fuzzy and higher-order derivations (not for `STRICT`)
//! 5. **Hinted relaxed**: relaxed with hints applied (not for `STRICT`)
//! 6. **Loose identifier**: the scientific name tried as an identifier
//! 7. **Vernacular**: the vernacular name
//! 8. **Loose vernacular**: the scientific name tried as a vernacular name
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taxon_solver::{MatchingEngine, Search, SpeciesGroups, TaxonomyIndex};
//!
//! let index = TaxonomyIndex::load_embedded().unwrap();
//! let engine = MatchingEngine::new(Arc::new(index), Arc::new(SpeciesGroups::default()));
//!
//! let result = engine.resolve(&Search::named("Acacia dealbata"));
//! println!("{:?} {:?}", result.taxon_concept_id, result.issues);
//! ```

pub mod classifier;
pub mod engine;
pub mod hints;
pub mod issues;

pub use classifier::{Classifier, ClassifierError, ClassifierMatch, MatchOptions};
pub use engine::{MatchingConfig, MatchingEngine};
