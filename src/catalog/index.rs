//! Name matching over a [`TaxonomyIndex`].

use std::collections::BTreeSet;

use crate::catalog::names::{self, ParsedName};
use crate::catalog::store::TaxonomyIndex;
use crate::core::search::LocationSearch;
use crate::core::taxon::TaxonConcept;
use crate::core::types::{Rank, TaxonomicStatus};
use crate::matching::classifier::{
    AutocompleteEntry, Classification, Classifier, ClassifierError, ClassifierMatch,
    InternalIssue, MatchEvidence, MatchOptions, TraceLevel,
};
use crate::matching::hints;

/// Convert a count to f64 for ratio calculations.
#[inline]
#[allow(clippy::cast_precision_loss)]
fn count_to_f64(count: usize) -> f64 {
    count as f64
}

/// Prior confidence attached to each kind of evidence
fn evidence_probability(evidence: MatchEvidence) -> f64 {
    match evidence {
        MatchEvidence::TaxonId | MatchEvidence::Exact => 1.0,
        MatchEvidence::Canonical => 0.95,
        MatchEvidence::Vernacular => 0.9,
        MatchEvidence::Phrase => 0.85,
        MatchEvidence::Fuzzy | MatchEvidence::SoundsLike => 0.8,
        MatchEvidence::HigherOrder | MatchEvidence::Recursive => 0.5,
    }
}

/// Share of the longer name covered by the common prefix of both
fn name_fidelity(query: &str, matched: &str) -> f64 {
    let query = query.to_lowercase();
    let matched = matched.to_lowercase();
    let common = query
        .chars()
        .zip(matched.chars())
        .take_while(|(a, b)| a == b)
        .count();
    let longest = query.chars().count().max(matched.chars().count());
    if longest == 0 {
        return 0.0;
    }
    count_to_f64(common) / count_to_f64(longest)
}

/// Records matching steps when tracing is on
struct Trace {
    level: TraceLevel,
    lines: Vec<String>,
}

impl Trace {
    fn new(level: TraceLevel) -> Self {
        Self {
            level,
            lines: Vec::new(),
        }
    }

    fn summary(&mut self, line: impl FnOnce() -> String) {
        if self.level != TraceLevel::Off {
            self.lines.push(line());
        }
    }

    fn full(&mut self, line: impl FnOnce() -> String) {
        if self.level == TraceLevel::Full {
            self.lines.push(line());
        }
    }
}

impl TaxonomyIndex {
    fn key(&self, text: &str) -> String {
        self.normalizer.normalize_str(text)
    }

    fn exact_candidates(&self, name: &str) -> &[usize] {
        self.name_to_concepts
            .get(&self.key(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The matched usage, its accepted concept when different, and the issues
    /// the usage itself raises
    fn usage(&self, index: usize) -> (TaxonConcept, Option<TaxonConcept>, BTreeSet<InternalIssue>) {
        let matched = &self.concepts[index];
        let mut issues = BTreeSet::new();
        let accepted_index = self.accepted_index(index);
        let accepted = (accepted_index != index).then(|| self.concepts[accepted_index].clone());

        match matched.status {
            TaxonomicStatus::Misapplied => {
                issues.insert(InternalIssue::MisappliedName);
            }
            TaxonomicStatus::Excluded => {
                issues.insert(InternalIssue::ExcludedName);
            }
            TaxonomicStatus::Synonym => {
                if accepted.as_ref().is_some_and(|a| a.rank < matched.rank) {
                    issues.insert(InternalIssue::ParentChildSynonym);
                }
            }
            TaxonomicStatus::Accepted => {}
        }

        (matched.clone(), accepted, issues)
    }

    /// Whether an accepted concept agrees with the supplied higher ranks
    /// (and hints, when asked to use them)
    fn consistent(&self, accepted: usize, classification: &Classification, use_hints: bool) -> bool {
        let hc = &self.concepts[accepted].classification;
        let ranks_agree = Rank::LINNAEAN.iter().all(|&rank| {
            match (classification.name_at(rank), hc.name_at(rank)) {
                (Some(given), Some(actual)) => self.key(given) == self.key(actual),
                _ => true,
            }
        });
        ranks_agree && (!use_hints || hints::check(hc, &classification.hints))
    }

    /// Pick one usage from the candidates for a name, disambiguating homonyms
    fn select(
        &self,
        candidates: &[usize],
        classification: &Classification,
        options: &MatchOptions,
        evidence: MatchEvidence,
        trace: &mut Trace,
    ) -> ClassifierMatch {
        let mut issues = BTreeSet::new();

        // Prefer genuine usages over misapplications of the same name
        let mut pool: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| self.concepts[i].status != TaxonomicStatus::Misapplied)
            .collect();
        if pool.is_empty() {
            pool = candidates.to_vec();
        } else if pool.len() < candidates.len() {
            issues.insert(InternalIssue::MisappliedName);
        }

        if let Some(rank) = classification.rank {
            let ranked: Vec<usize> = pool
                .iter()
                .copied()
                .filter(|&i| self.concepts[i].rank == rank)
                .collect();
            if !ranked.is_empty() {
                pool = ranked;
            }
        }

        let mut accepted: Vec<usize> = Vec::new();
        for &i in &pool {
            let a = self.accepted_index(i);
            if !accepted.contains(&a) {
                accepted.push(a);
            }
        }

        if accepted.len() > 1 {
            issues.insert(InternalIssue::Homonym);
            let narrowed: Vec<usize> = accepted
                .iter()
                .copied()
                .filter(|&a| self.consistent(a, classification, options.use_hints))
                .collect();
            trace.summary(|| {
                format!(
                    "homonym: {} candidates, {} consistent with classification",
                    accepted.len(),
                    narrowed.len()
                )
            });
            if narrowed.len() != 1 {
                let mut result = ClassifierMatch::invalid().with_issue(InternalIssue::UnresolvedHomonym);
                result.issues.extend(issues);
                return result;
            }
            pool.retain(|&i| self.accepted_index(i) == narrowed[0]);
        }

        let Some(&chosen) = pool.first() else {
            return ClassifierMatch::invalid();
        };
        let (matched, accepted_concept, usage_issues) = self.usage(chosen);
        issues.extend(usage_issues);
        if !self.consistent(self.accepted_index(chosen), classification, false) {
            issues.insert(InternalIssue::ConflictingClassification);
        }
        trace.full(|| format!("selected {} ({})", matched.taxon_id, matched.scientific_name));

        let mut result = ClassifierMatch::found(matched, accepted_concept, evidence);
        result.issues.extend(issues);
        result
    }

    fn try_names(
        &self,
        keys: &[String],
        classification: &Classification,
        options: &MatchOptions,
        evidence: MatchEvidence,
        trace: &mut Trace,
    ) -> Option<ClassifierMatch> {
        for name in keys {
            let candidates = self.exact_candidates(name);
            trace.full(|| format!("{evidence:?} lookup '{name}': {} candidates", candidates.len()));
            if !candidates.is_empty() {
                return Some(self.select(candidates, classification, options, evidence, trace));
            }
        }
        None
    }

    /// Names to try when climbing to a higher taxon: the genus of the query
    /// name, then the supplied ranks from genus upwards
    fn higher_names(parsed: &ParsedName, classification: &Classification) -> Vec<String> {
        let mut names = Vec::new();
        let mut words = parsed.canonical.split_whitespace();
        if let (Some(genus), Some(_)) = (words.next(), words.next()) {
            names.push(genus.to_string());
        }
        for rank in Rank::LINNAEAN.iter().rev() {
            if let Some(name) = classification.name_at(*rank) {
                if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    fn measure(&self, result: &mut ClassifierMatch, query: &str, options: &MatchOptions) {
        if !options.measure || !result.valid {
            return;
        }
        let probability = result
            .evidence
            .iter()
            .map(|&e| evidence_probability(e))
            .fold(1.0, f64::min);
        result.probability = Some(probability);
        result.fidelity = result
            .matched
            .as_ref()
            .map(|m| name_fidelity(query, &m.scientific_name));
    }

    fn finish(
        &self,
        mut result: ClassifierMatch,
        parsed: &ParsedName,
        query: &str,
        options: &MatchOptions,
        trace: Trace,
    ) -> ClassifierMatch {
        result.issues.extend(parsed.issues.iter().copied());
        self.measure(&mut result, query, options);
        result.trace = trace.lines;
        result
    }

    fn entry(&self, index: usize) -> AutocompleteEntry {
        let concept = &self.concepts[index];
        let accepted_index = self.accepted_index(index);
        let accepted = &self.concepts[accepted_index];
        AutocompleteEntry {
            name: concept.scientific_name.clone(),
            taxon_id: concept.taxon_id.clone(),
            rank: concept.rank,
            synonym: concept.is_synonym(),
            accepted_name: (accepted_index != index).then(|| accepted.scientific_name.clone()),
            vernacular_names: self.vernaculars[accepted_index].clone(),
            left: accepted.left,
            right: accepted.right,
        }
    }
}

impl Classifier for TaxonomyIndex {
    fn search(
        &self,
        classification: &Classification,
        options: &MatchOptions,
    ) -> Result<ClassifierMatch, ClassifierError> {
        let Some(query) = classification.query_name() else {
            return Ok(ClassifierMatch::invalid());
        };
        let mut trace = Trace::new(options.trace);
        trace.summary(|| format!("query '{query}'"));

        let exact = ParsedName {
            canonical: query.clone(),
            issues: BTreeSet::new(),
        };
        if let Some(found) = self.try_names(
            &[query.clone()],
            classification,
            options,
            MatchEvidence::Exact,
            &mut trace,
        ) {
            trace.summary(|| "exact match".to_string());
            return Ok(self.finish(found, &exact, &query, options, trace));
        }

        let parsed = names::parse(&query);
        if options.canonical_derivations
            && !parsed.canonical.is_empty()
            && self.key(&parsed.canonical) != self.key(&query)
        {
            if let Some(found) = self.try_names(
                &[parsed.canonical.clone()],
                classification,
                options,
                MatchEvidence::Canonical,
                &mut trace,
            ) {
                trace.summary(|| format!("canonical match on '{}'", parsed.canonical));
                return Ok(self.finish(found, &parsed, &query, options, trace));
            }
        }

        if options.fuzzy_derivations && !parsed.is_indeterminate() {
            let key = names::fuzzy_key(&self.key(&parsed.canonical));
            if let Some(candidates) = self.fuzzy_to_concepts.get(&key) {
                trace.summary(|| format!("fuzzy match on '{key}'"));
                let found = self.select(
                    candidates,
                    classification,
                    options,
                    MatchEvidence::Fuzzy,
                    &mut trace,
                );
                return Ok(self.finish(found, &parsed, &query, options, trace));
            }
        }

        if options.higher_order {
            let names = Self::higher_names(&parsed, classification);
            let higher = Classification {
                rank: None,
                scientific_name: None,
                ..classification.clone()
            };
            if let Some(found) = self.try_names(
                &names,
                &higher,
                options,
                MatchEvidence::HigherOrder,
                &mut trace,
            ) {
                trace.summary(|| "higher-order match".to_string());
                return Ok(self.finish(found, &parsed, &query, options, trace));
            }
        }

        trace.summary(|| "no match".to_string());
        let mut result = ClassifierMatch::invalid();
        result.trace = trace.lines;
        Ok(result)
    }

    fn search_by_id(&self, id: &str) -> Result<ClassifierMatch, ClassifierError> {
        let Some(&index) = self.id_to_index.get(id.trim()) else {
            return Ok(ClassifierMatch::invalid());
        };
        let (matched, accepted, issues) = self.usage(index);
        let mut result = ClassifierMatch::found(matched, accepted, MatchEvidence::TaxonId);
        result.issues = issues;
        Ok(result)
    }

    fn search_vernacular(
        &self,
        name: &str,
        options: &MatchOptions,
    ) -> Result<ClassifierMatch, ClassifierError> {
        let Some(candidates) = self.vernacular_to_concepts.get(&self.key(name)) else {
            return Ok(ClassifierMatch::invalid());
        };

        let mut accepted: Vec<usize> = candidates.iter().map(|&i| self.accepted_index(i)).collect();
        accepted.sort_unstable();
        accepted.dedup();
        if accepted.len() != 1 {
            // A common name shared by several taxa identifies none of them
            return Ok(ClassifierMatch::invalid());
        }

        let (matched, accepted_concept, issues) = self.usage(candidates[0]);
        let mut result = ClassifierMatch::found(matched, accepted_concept, MatchEvidence::Vernacular);
        result.issues = issues;
        self.measure(&mut result, name, options);
        if result.fidelity.is_some() {
            // Measured against the vernacular name, which matched exactly
            result.fidelity = Some(1.0);
        }
        Ok(result)
    }

    fn check_location(&self, location: &LocationSearch) -> Result<(), ClassifierError> {
        if self.areas.is_empty() {
            return Ok(());
        }
        for place in [&location.country, &location.state_province]
            .into_iter()
            .flatten()
        {
            if !self.areas.contains(&self.key(place)) {
                return Err(ClassifierError::InvalidLocation(place.clone()));
            }
        }
        Ok(())
    }

    fn check(&self, name: &str, rank: Option<Rank>) -> Result<Option<bool>, ClassifierError> {
        let candidates = self.exact_candidates(name);
        if candidates.is_empty() {
            return Ok(None);
        }
        Ok(Some(rank.map_or(true, |rank| {
            candidates.iter().any(|&i| self.concepts[i].rank == rank)
        })))
    }

    fn autocomplete(
        &self,
        prefix: &str,
        max: usize,
        include_synonyms: bool,
    ) -> Result<Vec<AutocompleteEntry>, ClassifierError> {
        let prefix = self.key(prefix);
        if prefix.is_empty() {
            return Err(ClassifierError::InvalidQuery("empty prefix".to_string()));
        }

        let scientific = self
            .name_to_concepts
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix));
        let vernacular = self
            .vernacular_to_concepts
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix));

        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();
        for (_, indices) in scientific.chain(vernacular) {
            for &index in indices {
                if entries.len() >= max {
                    return Ok(entries);
                }
                if !include_synonyms && self.concepts[index].is_synonym() {
                    continue;
                }
                if seen.insert(index) {
                    entries.push(self.entry(index));
                }
            }
        }
        Ok(entries)
    }

    fn vernacular_names(&self, taxon_id: &str, max: usize) -> Result<Vec<String>, ClassifierError> {
        let Some(&index) = self.id_to_index.get(taxon_id) else {
            return Ok(Vec::new());
        };
        let own = &self.vernaculars[index];
        let names = if own.is_empty() {
            &self.vernaculars[self.accepted_index(index)]
        } else {
            own
        };
        Ok(names.iter().take(max).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SearchStyle;

    fn index() -> TaxonomyIndex {
        TaxonomyIndex::load_embedded().unwrap()
    }

    fn relaxed() -> MatchOptions {
        MatchOptions::for_style(SearchStyle::Match)
    }

    #[test]
    fn test_exact_match() {
        let result = index()
            .search(&Classification::named("Acacia dealbata", None), &MatchOptions::strict())
            .unwrap();
        assert!(result.valid);
        assert_eq!(result.matched.unwrap().taxon_id, "ACA-DEA");
        assert!(result.evidence.contains(&MatchEvidence::Exact));
        assert!(result.left.is_some());
    }

    #[test]
    fn test_canonical_match_strips_authorship_and_qualifiers() {
        let index = index();
        let result = index
            .search(
                &Classification::named("Acacia cf. dealbata Link", None),
                &MatchOptions::strict(),
            )
            .unwrap();
        assert!(result.valid);
        assert!(result.evidence.contains(&MatchEvidence::Canonical));
        assert!(result.issues.contains(&InternalIssue::ConferSpecies));
        assert!(result.issues.contains(&InternalIssue::RemovedAuthorship));

        let result = index
            .search(&Classification::named("Acacia sp.", None), &MatchOptions::strict())
            .unwrap();
        assert_eq!(result.matched.unwrap().rank, Rank::Genus);
        assert!(result.issues.contains(&InternalIssue::IndeterminateSpecies));
    }

    #[test]
    fn test_fuzzy_only_when_allowed() {
        let index = index();
        let query = Classification::named("Acacia dealbatus", None);
        assert!(!index.search(&query, &MatchOptions::strict()).unwrap().valid);

        let result = index.search(&query, &relaxed()).unwrap();
        assert!(result.valid);
        assert!(result.evidence.contains(&MatchEvidence::Fuzzy));
    }

    #[test]
    fn test_higher_order_climbs_to_genus() {
        let index = index();
        let query = Classification::named("Eucalyptus imaginaria", None);
        assert!(!index.search(&query, &MatchOptions::strict()).unwrap().valid);

        let result = index.search(&query, &relaxed()).unwrap();
        assert!(result.valid);
        assert_eq!(result.matched.unwrap().scientific_name, "Eucalyptus");
        assert!(result.evidence.contains(&MatchEvidence::HigherOrder));
    }

    #[test]
    fn test_homonym_disambiguation() {
        let index = index();
        let bare = index
            .search(&Classification::named("Morus", None), &MatchOptions::strict())
            .unwrap();
        assert!(!bare.valid);
        assert!(bare.issues.contains(&InternalIssue::UnresolvedHomonym));

        let birds = Classification {
            kingdom: Some("Animalia".to_string()),
            ..Classification::named("Morus", None)
        };
        let result = index.search(&birds, &MatchOptions::strict()).unwrap();
        assert!(result.valid);
        assert!(result.issues.contains(&InternalIssue::Homonym));
        assert_eq!(
            result.matched.unwrap().classification.kingdom.as_deref(),
            Some("Animalia")
        );

        let mut hinted = Classification::named("Morus", None);
        hinted
            .hints
            .insert("kingdom".to_string(), vec!["Plantae".to_string()]);
        let ignored = index.search(&hinted, &MatchOptions::strict()).unwrap();
        assert!(!ignored.valid);
        let used = index
            .search(&hinted, &MatchOptions::strict().with_hints(true))
            .unwrap();
        assert!(used.valid);
    }

    #[test]
    fn test_synonym_and_usage_issues() {
        let index = index();
        let synonym = index.search_by_id("RAC-DEA").unwrap();
        assert!(synonym.valid);
        assert_eq!(synonym.accepted_concept().unwrap().taxon_id, "ACA-DEA");

        let misapplied = index
            .search(&Classification::named("Acacia mollissima", None), &MatchOptions::strict())
            .unwrap();
        assert!(misapplied.issues.contains(&InternalIssue::MisappliedName));

        let excluded = index.search_by_id("ACA-FAR").unwrap();
        assert!(excluded.issues.contains(&InternalIssue::ExcludedName));

        let parent_child = index.search_by_id("PHA-CIN-VIC").unwrap();
        assert!(parent_child
            .issues
            .contains(&InternalIssue::ParentChildSynonym));
    }

    #[test]
    fn test_vernacular_lookup() {
        let result = index()
            .search_vernacular("silver wattle", &relaxed())
            .unwrap();
        assert!(result.valid);
        assert_eq!(result.accepted_concept().unwrap().taxon_id, "ACA-DEA");
        assert!(!index().search_vernacular("purple cow", &relaxed()).unwrap().valid);
    }

    #[test]
    fn test_check_location_and_check() {
        let index = index();
        let good = LocationSearch {
            country: Some("Australia".to_string()),
            state_province: Some("victoria".to_string()),
            locality: None,
        };
        assert!(index.check_location(&good).is_ok());
        let bad = LocationSearch {
            country: Some("Atlantis".to_string()),
            ..LocationSearch::default()
        };
        assert!(matches!(
            index.check_location(&bad),
            Err(ClassifierError::InvalidLocation(_))
        ));

        assert_eq!(index.check("Acacia", Some(Rank::Genus)).unwrap(), Some(true));
        assert_eq!(index.check("Acacia", Some(Rank::Family)).unwrap(), Some(false));
        assert_eq!(index.check("Nonexistentia", None).unwrap(), None);
    }

    #[test]
    fn test_autocomplete() {
        let index = index();
        let entries = index.autocomplete("acacia d", 10, false).unwrap();
        assert!(entries.iter().any(|e| e.name == "Acacia dealbata"));
        assert!(entries.iter().all(|e| !e.synonym));

        let by_common = index.autocomplete("Koal", 10, true).unwrap();
        assert_eq!(by_common[0].name, "Phascolarctos cinereus");

        assert_eq!(index.autocomplete("a", 2, true).unwrap().len(), 2);
        assert!(index.autocomplete("  ", 2, true).is_err());
    }

    #[test]
    fn test_trace_and_measure() {
        let options = relaxed().with_trace(TraceLevel::Full).with_measure(true);
        let result = index()
            .search(&Classification::named("Acacia dealbatus", None), &options)
            .unwrap();
        assert!(!result.trace.is_empty());
        assert_eq!(result.probability, Some(0.8));
        assert!(result.fidelity.is_some_and(|f| f > 0.5 && f < 1.0));
    }

    #[test]
    fn test_vernacular_names_for_taxon() {
        let index = index();
        assert_eq!(
            index.vernacular_names("ACA-DEA", 5).unwrap(),
            vec!["Silver Wattle", "Mimosa"]
        );
        assert_eq!(index.vernacular_names("ACA-DEA", 1).unwrap().len(), 1);
        // Synonyms fall back to the accepted concept's names
        assert_eq!(index.vernacular_names("RAC-DEA", 5).unwrap()[0], "Silver Wattle");
        assert!(index.vernacular_names("missing", 5).unwrap().is_empty());
    }
}
