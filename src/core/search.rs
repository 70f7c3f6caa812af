use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::SearchStyle;

/// Where an observation was made, used to sanity-check a match
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationSearch {
    pub country: Option<String>,
    pub state_province: Option<String>,
    pub locality: Option<String>,
}

impl LocationSearch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.state_province.is_none() && self.locality.is_none()
    }
}

/// A (possibly partial) classification to resolve to a single taxon.
///
/// Two searches are equal when every field is equal, which makes a normalized
/// `Search` directly usable as a cache key. Hints are kept in an ordered map so
/// hashing does not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Search {
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub specific_epithet: Option<String>,
    pub infraspecific_epithet: Option<String>,

    pub scientific_name: Option<String>,
    pub scientific_name_authorship: Option<String>,
    pub vernacular_name: Option<String>,

    /// Verbatim rank as supplied by the caller
    pub rank: Option<String>,

    #[serde(rename = "taxonConceptID")]
    pub taxon_concept_id: Option<String>,

    #[serde(rename = "taxonID")]
    pub taxon_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationSearch>,

    /// Rank name -> acceptable values for that rank
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub hints: BTreeMap<String, Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<SearchStyle>,

    /// Allow the scientific name to be tried as an identifier or vernacular name
    pub loose: bool,
}

impl Search {
    /// A search for a bare scientific name
    pub fn named(scientific_name: impl Into<String>) -> Self {
        Self {
            scientific_name: Some(scientific_name.into()),
            ..Self::default()
        }
    }

    /// A search for a vernacular (common) name
    pub fn vernacular(vernacular_name: impl Into<String>) -> Self {
        Self {
            vernacular_name: Some(vernacular_name.into()),
            ..Self::default()
        }
    }

    /// A search by taxon concept identifier
    pub fn by_id(taxon_concept_id: impl Into<String>) -> Self {
        Self {
            taxon_concept_id: Some(taxon_concept_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_hint<I, S>(mut self, rank: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints
            .entry(rank.to_lowercase())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: SearchStyle) -> Self {
        self.style = Some(style);
        self
    }

    #[must_use]
    pub fn with_loose(mut self, loose: bool) -> Self {
        self.loose = loose;
        self
    }

    #[must_use]
    pub fn with_kingdom(mut self, kingdom: impl Into<String>) -> Self {
        self.kingdom = Some(kingdom.into());
        self
    }

    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: LocationSearch) -> Self {
        self.location = Some(location);
        self
    }

    /// The identifier to try first, preferring the taxon concept identifier
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.taxon_concept_id
            .as_deref()
            .or(self.taxon_id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }

    /// Whether there is anything to run a classification match on
    #[must_use]
    pub fn has_name_fields(&self) -> bool {
        [
            &self.scientific_name,
            &self.kingdom,
            &self.phylum,
            &self.class,
            &self.order,
            &self.family,
            &self.genus,
            &self.specific_epithet,
            &self.infraspecific_epithet,
        ]
        .iter()
        .any(|field| field.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }

    /// The effective style, falling back to a configured default
    #[must_use]
    pub fn style_or(&self, default: SearchStyle) -> SearchStyle {
        self.style.unwrap_or(default)
    }

    #[must_use]
    pub fn has_hints(&self) -> bool {
        self.hints.values().any(|values| !values.is_empty())
    }
}
