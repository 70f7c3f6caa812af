//! Resolver configuration.
//!
//! All fields have defaults, so a configuration file only needs to name the
//! settings it changes:
//!
//! ```json
//! {
//!   "useHints": false,
//!   "defaultStyle": "STRICT",
//!   "searchCache": { "capacity": 50000, "cacheNegatives": false },
//!   "taxonomy": "/data/taxa.tsv.gz"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CachePolicy;
use crate::catalog::store::{TaxonomyError, TaxonomyIndex};
use crate::groups::builder::{self, GroupDefinition, GroupError};
use crate::matching::MatchingConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to load taxonomy: {0}")]
    Taxonomy(#[from] TaxonomyError),

    #[error("Failed to load species groups: {0}")]
    Groups(#[from] GroupError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    #[serde(flatten)]
    pub matching: MatchingConfig,

    /// Policy of the cache keyed by search
    pub search_cache: CachePolicy,

    /// Policy of the two caches keyed by identifier
    pub id_cache: CachePolicy,

    /// Species group definitions; the embedded set when absent
    pub species_groups: Option<PathBuf>,

    /// Taxonomy file; the embedded sample taxonomy when absent
    pub taxonomy: Option<PathBuf>,
}

impl ResolverConfig {
    /// Load configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load configuration from an optional file, defaults otherwise
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a named file cannot be read or parsed.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Load the configured taxonomy
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Taxonomy` if it cannot be loaded.
    pub fn load_taxonomy(&self) -> Result<TaxonomyIndex, ConfigError> {
        let index = match &self.taxonomy {
            Some(path) => TaxonomyIndex::load_from_file(path)?,
            None => TaxonomyIndex::load_embedded()?,
        };
        Ok(index)
    }

    /// Load the configured species group definitions
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Groups` if they cannot be loaded.
    pub fn load_group_definitions(&self) -> Result<Vec<GroupDefinition>, ConfigError> {
        let definitions = match &self.species_groups {
            Some(path) => builder::load_definitions(path)?,
            None => builder::embedded_definitions()?,
        };
        Ok(definitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SearchStyle;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert!(config.matching.use_hints);
        assert!(config.matching.check_hints);
        assert!(config.matching.allow_loose);
        assert_eq!(config.matching.default_style, SearchStyle::Match);
        assert!(!config.matching.measure);
        assert!(config.taxonomy.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"useHints": false, "defaultStyle": "STRICT", "searchCache": {{"cacheNegatives": false}}}}"#
        )
        .unwrap();

        let config = ResolverConfig::load(file.path()).unwrap();
        assert!(!config.matching.use_hints);
        assert!(config.matching.check_hints);
        assert_eq!(config.matching.default_style, SearchStyle::Strict);
        assert!(!config.search_cache.cache_negatives);
        assert_eq!(config.search_cache.capacity, CachePolicy::default().capacity);
        assert_eq!(config.id_cache, CachePolicy::default());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            ResolverConfig::load(file.path()),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            ResolverConfig::load(Path::new("/nonexistent/config.json")),
            Err(ConfigError::ReadError(_))
        ));
    }

    #[test]
    fn test_embedded_sources() {
        let config = ResolverConfig::default();
        assert!(!config.load_taxonomy().unwrap().is_empty());
        assert!(!config.load_group_definitions().unwrap().is_empty());
    }
}
