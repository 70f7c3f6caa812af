//! # taxon-solver
//!
//! A library for resolving taxonomic names and classifications to a single
//! best-matching taxon.
//!
//! Biodiversity records arrive with scientific names that are misspelled,
//! outdated, ambiguous or only partly filled in. `taxon-solver` resolves each
//! search against a reference taxonomy by trying a chain of increasingly
//! permissive strategies, and reports how the match was made and what looked
//! wrong along the way.
//!
//! ## Features
//!
//! - **Fallback chain**: identifier, hinted and plain strict matching, fuzzy
//!   and higher-order matching, vernacular names
//! - **Normalization**: spaces, punctuation, symbols and accents folded before matching
//! - **Hints**: expected higher ranks used to pick between homonyms and to flag
//!   contradicting matches
//! - **Species groups**: curated taxon buckets computed from tree intervals
//! - **Caching**: per-key single-flight result caches with bulk resolution
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taxon_solver::{MatchingEngine, Search, SpeciesGroups, TaxonomyIndex};
//!
//! // Load the embedded sample taxonomy
//! let index = Arc::new(TaxonomyIndex::load_embedded().unwrap());
//! let engine = MatchingEngine::new(index, Arc::new(SpeciesGroups::default()));
//!
//! let result = engine.resolve(&Search::named("Acacia dealbata").with_kingdom("Plantae"));
//! println!("{:?} {:?}", result.taxon_concept_id, result.issues);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Searches, results, taxon concepts and labels
//! - [`utils`]: Normalization and input validation
//! - [`matching`]: The classifier contract, hint and issue handling, the engine
//! - [`groups`]: Species groups and their construction
//! - [`catalog`]: The in-memory reference taxonomy
//! - [`cache`]: Single-flight result caches and bulk resolution
//! - [`service`]: The public matching operations
//! - [`client`]: Client for a running server
//! - [`parsing`]: Search list and taxon file parsers
//! - [`config`]: Resolver configuration
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: HTTP API

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod groups;
pub mod matching;
pub mod parsing;
pub mod service;
pub mod utils;
pub mod web;

// Re-export commonly used types for convenience
pub use cache::{CachePolicy, ResultCache};
pub use catalog::store::TaxonomyIndex;
pub use config::ResolverConfig;
pub use core::result::MatchResult;
pub use core::search::{LocationSearch, Search};
pub use core::types::*;
pub use groups::SpeciesGroups;
pub use matching::{Classifier, MatchingEngine};
pub use service::MatchService;
