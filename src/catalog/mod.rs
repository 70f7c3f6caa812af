//! Reference taxonomy storage and name matching.
//!
//! A [`TaxonomyIndex`](store::TaxonomyIndex) holds a taxonomy in memory and
//! implements the [`Classifier`](crate::matching::classifier::Classifier)
//! contract over it. An embedded sample taxonomy is compiled into the binary,
//! but larger taxonomies can be loaded from JSON or Darwin Core taxon files.
//!
//! ## Matching
//!
//! - **Exact**: normalized scientific name lookup
//! - **Canonical**: authorship, rank markers and qualifiers (`sp.`, `cf.`,
//!   `aff.`, `?`) removed
//! - **Fuzzy**: Latin epithet gender endings equated (`alba`/`albus`)
//! - **Higher order**: climbing to the genus or a supplied higher rank
//!
//! Names shared by several accepted taxa are disambiguated by the supplied
//! higher ranks, and by hints when the options allow.
//!
//! ## Example
//!
//! ```rust,no_run
//! use taxon_solver::TaxonomyIndex;
//! use taxon_solver::matching::classifier::{Classification, Classifier, MatchOptions};
//!
//! let index = TaxonomyIndex::load_embedded().unwrap();
//! let found = index
//!     .search(&Classification::named("Acacia dealbata", None), &MatchOptions::strict())
//!     .unwrap();
//! println!("{:?}", found.matched.map(|c| c.taxon_id));
//! ```
//!
//! ## Custom Taxonomies
//!
//! ```rust,no_run
//! use taxon_solver::TaxonomyIndex;
//! use std::path::Path;
//!
//! // Export to JSON
//! let taxonomy = TaxonomyIndex::load_embedded().unwrap();
//! let json = taxonomy.to_json().unwrap();
//!
//! // Load from a Darwin Core taxon file
//! let custom = TaxonomyIndex::load_from_file(Path::new("taxa.tsv")).unwrap();
//! ```

pub mod index;
pub mod names;
pub mod store;
