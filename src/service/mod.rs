//! The public matching operations.
//!
//! [`MatchService`] normalizes incoming searches, routes them through the
//! result caches and the [`MatchingEngine`], and offers the supplementary
//! lookups (name checks, autocomplete, identifier and vernacular name
//! queries) used by the HTTP API and the CLI.

use std::sync::Arc;

use tracing::info;

use crate::cache::{BulkResolver, ResolveError, ResultCache};
use crate::config::{ConfigError, ResolverConfig};
use crate::core::result::MatchResult;
use crate::core::search::Search;
use crate::core::types::Rank;
use crate::groups::{builder, SpeciesGroups};
use crate::matching::classifier::{AutocompleteEntry, Classifier};
use crate::matching::MatchingEngine;
use crate::utils::normalize::{Normalizer, NormalizerOptions};

pub struct MatchService {
    engine: Arc<MatchingEngine>,
    normalizer: Normalizer,
    search_cache: ResultCache<Search, MatchResult>,
    id_cache: ResultCache<String, MatchResult>,
    id_follow_cache: ResultCache<String, MatchResult>,
}

impl MatchService {
    /// Create a service over an engine, with caches following `config`
    #[must_use]
    pub fn new(engine: Arc<MatchingEngine>, config: &ResolverConfig) -> Self {
        let search_engine = engine.clone();
        let id_engine = engine.clone();
        let follow_engine = engine.clone();

        Self {
            engine,
            normalizer: Normalizer::new(NormalizerOptions::default()),
            search_cache: ResultCache::new("search", config.search_cache, move |search: &Search| {
                Ok(search_engine.try_resolve(search)?)
            }),
            id_cache: ResultCache::new("id", config.id_cache, move |id: &String| {
                Ok(id_engine.try_resolve_id(id, false)?)
            }),
            id_follow_cache: ResultCache::new("id-follow", config.id_cache, move |id: &String| {
                Ok(follow_engine.try_resolve_id(id, true)?)
            }),
        }
    }

    /// Load the configured taxonomy and species groups and build a service
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the taxonomy or group definitions cannot be loaded.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ConfigError> {
        let classifier: Arc<dyn Classifier> = Arc::new(config.load_taxonomy()?);
        let definitions = config.load_group_definitions()?;
        let groups = Arc::new(builder::build(&definitions, classifier.as_ref())?);
        info!(
            "Loaded {} species groups from {} definitions",
            groups.len(),
            definitions.len()
        );

        let engine = MatchingEngine::with_config(classifier, groups, config.matching);
        Ok(Self::new(Arc::new(engine), config))
    }

    #[must_use]
    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    #[must_use]
    pub fn groups(&self) -> &SpeciesGroups {
        self.engine.groups()
    }

    /// Resolve one search
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the cache does not suppress a loader error.
    pub fn match_search(&self, search: &Search) -> Result<MatchResult, ResolveError> {
        self.search_cache.get(&self.normalizer.normalize_search(search))
    }

    /// Resolve a list of searches, `None` entries staying `None`
    ///
    /// # Errors
    ///
    /// Returns the first unsuppressed loader error.
    pub fn match_all(&self, searches: &[Option<Search>]) -> Result<Vec<Option<MatchResult>>, ResolveError> {
        let normalized: Vec<Option<Search>> = searches
            .iter()
            .map(|s| s.as_ref().map(|s| self.normalizer.normalize_search(s)))
            .collect();
        BulkResolver::new(&self.search_cache).resolve_all(&normalized)
    }

    /// Look up a taxon by identifier without following synonyms
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the cache does not suppress a loader error.
    pub fn get(&self, id: &str) -> Result<MatchResult, ResolveError> {
        self.get_with_follow(id, false)
    }

    /// Look up a taxon by identifier, optionally following a synonym to its
    /// accepted concept
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the cache does not suppress a loader error.
    pub fn get_with_follow(&self, id: &str, follow: bool) -> Result<MatchResult, ResolveError> {
        self.id_cache_for(follow).get(&id.trim().to_string())
    }

    /// Look up a list of identifiers, `None` entries staying `None`
    ///
    /// # Errors
    ///
    /// Returns the first unsuppressed loader error.
    pub fn get_all(
        &self,
        ids: &[Option<String>],
        follow: bool,
    ) -> Result<Vec<Option<MatchResult>>, ResolveError> {
        let ids: Vec<Option<String>> = ids
            .iter()
            .map(|id| id.as_deref().map(|id| id.trim().to_string()))
            .collect();
        BulkResolver::new(self.id_cache_for(follow)).resolve_all(&ids)
    }

    fn id_cache_for(&self, follow: bool) -> &ResultCache<String, MatchResult> {
        if follow {
            &self.id_follow_cache
        } else {
            &self.id_cache
        }
    }

    /// Resolve a bare scientific name
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the cache does not suppress a loader error.
    pub fn search_name(&self, name: &str) -> Result<MatchResult, ResolveError> {
        self.match_search(&Search::named(name))
    }

    /// Resolve a vernacular name
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the cache does not suppress a loader error.
    pub fn search_vernacular(&self, name: &str) -> Result<MatchResult, ResolveError> {
        self.match_search(&Search::vernacular(name))
    }

    /// Whether a name is known at a rank: `Some(true)`, known at another
    /// rank: `Some(false)`, unknown: `None`
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Lookup` if the classifier fails.
    pub fn check(&self, name: &str, rank: Option<Rank>) -> Result<Option<bool>, ResolveError> {
        let name = self.normalizer.normalize_str(name);
        Ok(self.engine.classifier().check(&name, rank)?)
    }

    /// Names starting with a prefix
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Lookup` if the classifier fails.
    pub fn autocomplete(
        &self,
        prefix: &str,
        max: usize,
        include_synonyms: bool,
    ) -> Result<Vec<AutocompleteEntry>, ResolveError> {
        let prefix = self.normalizer.normalize_str(prefix);
        Ok(self
            .engine
            .classifier()
            .autocomplete(&prefix, max, include_synonyms)?)
    }

    /// The accepted identifier behind an identifier
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the cache does not suppress a loader error.
    pub fn lsid_for_id(&self, id: &str) -> Result<Option<String>, ResolveError> {
        Ok(accepted_id(self.get_with_follow(id, true)?))
    }

    /// The identifier a scientific name resolves to
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the cache does not suppress a loader error.
    pub fn lsid_for_name(&self, name: &str) -> Result<Option<String>, ResolveError> {
        Ok(accepted_id(self.search_name(name)?))
    }

    /// The identifier each name resolves to, in input order
    ///
    /// # Errors
    ///
    /// Returns the first unsuppressed loader error.
    pub fn guids_for_taxa(&self, names: &[Option<String>]) -> Result<Vec<Option<String>>, ResolveError> {
        let searches: Vec<Option<Search>> = names
            .iter()
            .map(|name| name.as_deref().map(Search::named))
            .collect();
        Ok(self
            .match_all(&searches)?
            .into_iter()
            .map(|result| result.and_then(accepted_id))
            .collect())
    }

    /// Vernacular names recorded for a taxon
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Lookup` if the classifier fails.
    pub fn common_names(&self, id: &str, max: usize) -> Result<Vec<String>, ResolveError> {
        Ok(self.engine.classifier().vernacular_names(id.trim(), max)?)
    }

    /// Log request counts of all caches
    pub fn log_cache_stats(&self) {
        self.search_cache.log_stats();
        self.id_cache.log_stats();
        self.id_follow_cache.log_stats();
    }
}

fn accepted_id(result: MatchResult) -> Option<String> {
    result.success.then_some(result.taxon_concept_id).flatten()
}
