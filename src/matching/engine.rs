use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::result::MatchResult;
use crate::core::search::Search;
use crate::core::types::SearchStyle;
use crate::groups::SpeciesGroups;
use crate::matching::classifier::{
    Classification, Classifier, ClassifierError, ClassifierMatch, MatchOptions, TraceLevel,
};
use crate::matching::{hints, issues};

/// Errors raised while turning a classifier match into a result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("valid match for '{0}' carries no concept")]
    MissingConcept(String),
}

/// Configuration for the matching engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchingConfig {
    /// Try hinted matches before unhinted ones
    pub use_hints: bool,
    /// Report `hintMismatch` when a match contradicts the hints
    pub check_hints: bool,
    /// Honour the `loose` flag of searches
    pub allow_loose: bool,
    /// Style for searches that do not name one
    pub default_style: SearchStyle,
    pub trace_level: TraceLevel,
    /// Ask the classifier for probability and fidelity
    pub measure: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            use_hints: true,
            check_hints: true,
            allow_loose: true,
            default_style: SearchStyle::Match,
            trace_level: TraceLevel::Off,
            measure: false,
        }
    }
}

/// One step of the fallback chain, in the order steps are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Identifier,
    HintedStrict,
    Strict,
    Relaxed,
    HintedRelaxed,
    LooseIdentifier,
    Vernacular,
    LooseVernacular,
}

impl Strategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::HintedStrict => "hinted strict",
            Self::Strict => "strict",
            Self::Relaxed => "relaxed",
            Self::HintedRelaxed => "hinted relaxed",
            Self::LooseIdentifier => "loose identifier",
            Self::Vernacular => "vernacular",
            Self::LooseVernacular => "loose vernacular",
        }
    }
}

/// Resolves searches to a single result by walking a chain of increasingly
/// permissive classifier queries
pub struct MatchingEngine {
    classifier: Arc<dyn Classifier>,
    groups: Arc<SpeciesGroups>,
    config: MatchingConfig,
}

impl MatchingEngine {
    /// Create a new matching engine with default configuration
    pub fn new(classifier: Arc<dyn Classifier>, groups: Arc<SpeciesGroups>) -> Self {
        Self::with_config(classifier, groups, MatchingConfig::default())
    }

    /// Create a new matching engine with custom configuration
    pub fn with_config(
        classifier: Arc<dyn Classifier>,
        groups: Arc<SpeciesGroups>,
        config: MatchingConfig,
    ) -> Self {
        Self {
            classifier,
            groups,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    #[must_use]
    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    #[must_use]
    pub fn groups(&self) -> &Arc<SpeciesGroups> {
        &self.groups
    }

    /// The strategies a search is eligible for, in the order they are tried
    #[must_use]
    pub fn plan(&self, search: &Search) -> Vec<Strategy> {
        let style = search.style_or(self.config.default_style);
        let hinted = self.config.use_hints && search.has_hints();
        let relaxed = style != SearchStyle::Strict;
        let loose = search.loose && self.config.allow_loose;
        let has_scientific = search
            .scientific_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());

        let mut plan = Vec::new();
        if search.identifier().is_some() {
            plan.push(Strategy::Identifier);
        }
        if search.has_name_fields() {
            if hinted {
                plan.push(Strategy::HintedStrict);
            }
            plan.push(Strategy::Strict);
            if relaxed {
                plan.push(Strategy::Relaxed);
                if hinted {
                    plan.push(Strategy::HintedRelaxed);
                }
            }
        }
        if loose && has_scientific {
            plan.push(Strategy::LooseIdentifier);
        }
        if search
            .vernacular_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty())
        {
            plan.push(Strategy::Vernacular);
        }
        if search.loose && has_scientific {
            plan.push(Strategy::LooseVernacular);
        }
        plan
    }

    /// Resolve a search to a single result.
    ///
    /// A classifier error that leaves the chain without any possible match
    /// becomes a failed result carrying `genericError` and the error's class
    /// and message; this never fails.
    #[must_use]
    pub fn resolve(&self, search: &Search) -> MatchResult {
        self.try_resolve(search)
            .unwrap_or_else(|e| MatchResult::error(e.kind(), &e.to_string()))
    }

    /// Resolve a search, returning the last classifier error when no strategy
    /// produced a possible match and at least one of them failed.
    ///
    /// A strategy that errors is logged and the chain moves on, so an error
    /// is only returned when nothing later succeeded.
    ///
    /// # Errors
    ///
    /// Returns the last `ClassifierError` raised by the chain when no strategy
    /// produced a possible match.
    pub fn try_resolve(&self, search: &Search) -> Result<MatchResult, ClassifierError> {
        let mut extra_issues = Vec::new();
        if let Some(location) = search.location.as_ref().filter(|l| !l.is_empty()) {
            if let Err(e) = self.classifier.check_location(location) {
                debug!("Location not resolved: {e}");
                extra_issues.push(issues::INVALID_LOCATION.to_string());
            }
        }

        let mut trace = Vec::new();
        let mut last_error = None;
        for strategy in self.plan(search) {
            match self.run(strategy, search) {
                Ok(Some(found)) => {
                    debug!("Strategy '{}' produced a possible match", strategy.as_str());
                    trace.push(format!("{}: possible match", strategy.as_str()));
                    return Ok(self.finish(Some(search), found, true, extra_issues, trace));
                }
                Ok(None) => {
                    debug!("Strategy '{}' found nothing", strategy.as_str());
                    trace.push(format!("{}: no match", strategy.as_str()));
                }
                Err(e) => {
                    warn!("Strategy '{}' failed: {e}", strategy.as_str());
                    trace.push(format!("{}: error: {e}", strategy.as_str()));
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            return Err(e);
        }

        extra_issues.push(issues::NO_MATCH.to_string());
        let mut result = MatchResult::failed(issues::finalize(extra_issues, false));
        result.trace = self.trace_output(trace);
        Ok(result)
    }

    /// Resolve a taxon identifier, optionally following a synonym to its
    /// accepted concept
    #[must_use]
    pub fn resolve_id(&self, id: &str, follow: bool) -> MatchResult {
        self.try_resolve_id(id, follow)
            .unwrap_or_else(|e| MatchResult::error(e.kind(), &e.to_string()))
    }

    /// Resolve a taxon identifier, passing classifier errors to the caller
    ///
    /// # Errors
    ///
    /// Returns the `ClassifierError` raised by the identifier lookup.
    pub fn try_resolve_id(&self, id: &str, follow: bool) -> Result<MatchResult, ClassifierError> {
        let found = self.classifier.search_by_id(id).map_err(|e| {
            warn!("Identifier lookup for '{id}' failed: {e}");
            e
        })?;
        if found.valid {
            Ok(self.finish(None, found, follow, Vec::new(), Vec::new()))
        } else {
            Ok(MatchResult::no_match())
        }
    }

    fn options(&self, base: MatchOptions) -> MatchOptions {
        base.with_trace(self.config.trace_level)
            .with_measure(self.config.measure)
    }

    /// Run one strategy; `Ok(None)` when it produced nothing worth stopping for
    fn run(
        &self,
        strategy: Strategy,
        search: &Search,
    ) -> Result<Option<ClassifierMatch>, ClassifierError> {
        let style = search.style_or(self.config.default_style);
        let scientific_name = search.scientific_name.as_deref().unwrap_or_default();

        let found = match strategy {
            Strategy::Identifier => {
                let id = search.identifier().unwrap_or_default();
                let found = self.classifier.search_by_id(id)?;
                // Only a definite hit short-circuits on an identifier
                return Ok(found.valid.then_some(found));
            }
            Strategy::HintedStrict => self.classifier.search(
                &Classification::from_search(search, true),
                &self.options(MatchOptions::strict().with_hints(true)),
            )?,
            Strategy::Strict => self.classifier.search(
                &Classification::from_search(search, false),
                &self.options(MatchOptions::strict()),
            )?,
            Strategy::Relaxed => self.classifier.search(
                &Classification::from_search(search, false),
                &self.options(MatchOptions::for_style(style)),
            )?,
            Strategy::HintedRelaxed => self.classifier.search(
                &Classification::from_search(search, true),
                &self.options(MatchOptions::for_style(style).with_hints(true)),
            )?,
            Strategy::LooseIdentifier => self.classifier.search_by_id(scientific_name)?,
            Strategy::Vernacular => self.classifier.search_vernacular(
                search.vernacular_name.as_deref().unwrap_or_default(),
                &self.options(MatchOptions::for_style(style)),
            )?,
            Strategy::LooseVernacular => self
                .classifier
                .search_vernacular(scientific_name, &self.options(MatchOptions::for_style(style)))?,
        };

        Ok(found.is_possible_match().then_some(found))
    }

    /// Assemble a result, converting assembly errors into a failed result
    fn finish(
        &self,
        search: Option<&Search>,
        found: ClassifierMatch,
        follow: bool,
        extra_issues: Vec<String>,
        trace: Vec<String>,
    ) -> MatchResult {
        match self.assemble(search, found, follow, extra_issues, trace) {
            Ok(result) => result,
            Err(e) => {
                warn!("Result assembly failed: {e}");
                MatchResult::error("AssemblyError", &e.to_string())
            }
        }
    }

    fn assemble(
        &self,
        search: Option<&Search>,
        found: ClassifierMatch,
        follow: bool,
        mut extra_issues: Vec<String>,
        mut trace: Vec<String>,
    ) -> Result<MatchResult, AssemblyError> {
        let mut public_issues = issues::classify(&found.issues);
        public_issues.append(&mut extra_issues);
        trace.extend(found.trace.iter().cloned());

        if !found.valid {
            // An ambiguity the caller should see rather than a plain miss
            let mut result = MatchResult::failed(issues::finalize(public_issues, false));
            result.trace = self.trace_output(trace);
            return Ok(result);
        }

        let concept = if follow {
            found.accepted_concept()
        } else {
            found.matched.as_ref().or(found.accepted.as_ref())
        }
        .ok_or_else(|| {
            AssemblyError::MissingConcept(
                search
                    .and_then(|s| s.scientific_name.clone())
                    .unwrap_or_default(),
            )
        })?;

        if let Some(search) = search.filter(|s| self.config.check_hints && s.has_hints()) {
            if !hints::check(&concept.classification, &search.hints) {
                debug!("Match '{}' contradicts the hints", concept.scientific_name);
                public_issues.push(issues::HINT_MISMATCH.to_string());
            }
        }

        let (lft, rgt) = if follow {
            (found.left, found.right)
        } else {
            (concept.left, concept.right)
        };
        let (species_group, species_subgroup) = lft.map_or_else(
            || (Vec::new(), Vec::new()),
            |position| {
                (
                    self.groups.groups_containing(position),
                    self.groups.subgroups_containing(position),
                )
            },
        );

        let synonym_type = found
            .matched
            .as_ref()
            .filter(|m| m.is_synonym())
            .map(|m| m.status);

        Ok(MatchResult {
            success: true,
            taxon_concept_id: Some(concept.taxon_id.clone()),
            scientific_name: Some(concept.scientific_name.clone()),
            scientific_name_authorship: concept.authorship.clone(),
            rank: Some(concept.rank),
            rank_id: Some(concept.rank.id()),
            classification: concept.classification.clone(),
            lft,
            rgt,
            match_type: issues::match_type(&found.evidence),
            name_type: found.matched.as_ref().map(|m| m.name_type),
            synonym_type,
            vernacular_name: concept.vernacular_name.clone(),
            species_group,
            species_subgroup,
            issues: issues::finalize(public_issues, true),
            trace: self.trace_output(trace),
            fidelity: found.fidelity.filter(|_| self.config.measure),
            probability: found.probability.filter(|_| self.config.measure),
        })
    }

    fn trace_output(&self, trace: Vec<String>) -> Option<Vec<String>> {
        match self.config.trace_level {
            TraceLevel::Off => None,
            _ => Some(trace),
        }
    }
}
