use serde::{Deserialize, Serialize};

/// Taxonomic rank of a concept.
///
/// Ranks are ordered from most general to most specific, so `Rank::Kingdom <
/// Rank::Species`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
    Subspecies,
    Variety,
    Form,
    Unranked,
}

impl Rank {
    /// The ranks carried by a higher classification, most general first
    pub const LINNAEAN: [Rank; 7] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    /// Numeric rank identifier, spaced so intermediate ranks can be slotted in
    #[must_use]
    pub fn id(self) -> u32 {
        match self {
            Self::Kingdom => 1000,
            Self::Phylum => 2000,
            Self::Class => 3000,
            Self::Order => 4000,
            Self::Family => 5000,
            Self::Genus => 6000,
            Self::Species => 7000,
            Self::Subspecies => 8000,
            Self::Variety => 8010,
            Self::Form => 8020,
            Self::Unranked => 9999,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kingdom => "kingdom",
            Self::Phylum => "phylum",
            Self::Class => "class",
            Self::Order => "order",
            Self::Family => "family",
            Self::Genus => "genus",
            Self::Species => "species",
            Self::Subspecies => "subspecies",
            Self::Variety => "variety",
            Self::Form => "form",
            Self::Unranked => "unranked",
        }
    }

    /// Parse a rank from its name or a common abbreviation (e.g. from a verbatim rank column)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "kingdom" | "regnum" => Some(Self::Kingdom),
            "phylum" | "division" | "divisio" => Some(Self::Phylum),
            "class" | "classis" => Some(Self::Class),
            "order" | "ordo" => Some(Self::Order),
            "family" | "familia" => Some(Self::Family),
            "genus" | "gen." => Some(Self::Genus),
            "species" | "sp." | "sp" => Some(Self::Species),
            "subspecies" | "subsp." | "subsp" | "ssp." | "ssp" => Some(Self::Subspecies),
            "variety" | "varietas" | "var." | "var" => Some(Self::Variety),
            "form" | "forma" | "f." => Some(Self::Form),
            "unranked" | "" => Some(Self::Unranked),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_infraspecific(self) -> bool {
        matches!(self, Self::Subspecies | Self::Variety | Self::Form)
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How permissive a search is allowed to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchStyle {
    /// Exact and canonical derivations only
    Strict,
    /// Allow fuzzy derivations of the name
    Fuzzy,
    /// Allow fuzzy derivations and matches to a higher-order taxon
    #[default]
    Match,
}

impl std::str::FromStr for SearchStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STRICT" => Ok(Self::Strict),
            "FUZZY" => Ok(Self::Fuzzy),
            "MATCH" => Ok(Self::Match),
            other => Err(format!("unknown search style '{other}'")),
        }
    }
}

impl std::fmt::Display for SearchStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "STRICT"),
            Self::Fuzzy => write!(f, "FUZZY"),
            Self::Match => write!(f, "MATCH"),
        }
    }
}

/// Taxonomic status of a name usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaxonomicStatus {
    #[default]
    Accepted,
    Synonym,
    /// Name used in the literature for a different taxon
    Misapplied,
    /// Taxon excluded from the region covered by the taxonomy
    Excluded,
}

impl TaxonomicStatus {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "synonym" | "heterotypicsynonym" | "homotypicsynonym" | "objective synonym"
            | "subjective synonym" | "proparte synonym" => Self::Synonym,
            "misapplied" | "misapplied name" => Self::Misapplied,
            "excluded" => Self::Excluded,
            _ => Self::Accepted,
        }
    }

    /// Whether the usage points at a different accepted concept
    #[must_use]
    pub fn is_synonym(self) -> bool {
        matches!(self, Self::Synonym | Self::Misapplied)
    }
}

/// Kind of name, as parsed from the scientific name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NameType {
    #[default]
    Scientific,
    Informal,
    Hybrid,
    Cultivar,
    Virus,
    Placeholder,
    Doubtful,
}

/// Match-type label, ordered by precedence.
///
/// When several kinds of evidence apply to one match the greatest label wins,
/// so the least certain derivation is the one reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchType {
    #[serde(rename = "taxonIdMatch")]
    TaxonId,
    #[serde(rename = "exactMatch")]
    Exact,
    #[serde(rename = "canonicalMatch")]
    Canonical,
    #[serde(rename = "phraseMatch")]
    Phrase,
    #[serde(rename = "fuzzyMatch")]
    Fuzzy,
    #[serde(rename = "vernacularMatch")]
    Vernacular,
    #[serde(rename = "higherMatch")]
    HigherOrder,
}

impl MatchType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaxonId => "taxonIdMatch",
            Self::Exact => "exactMatch",
            Self::Canonical => "canonicalMatch",
            Self::Phrase => "phraseMatch",
            Self::Fuzzy => "fuzzyMatch",
            Self::Vernacular => "vernacularMatch",
            Self::HigherOrder => "higherMatch",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_parse_abbreviations() {
        assert_eq!(Rank::parse("subsp."), Some(Rank::Subspecies));
        assert_eq!(Rank::parse("Var."), Some(Rank::Variety));
        assert_eq!(Rank::parse(" FAMILY "), Some(Rank::Family));
        assert_eq!(Rank::parse("clade"), None);
    }

    #[test]
    fn test_rank_ordering_and_ids() {
        assert!(Rank::Kingdom < Rank::Genus);
        assert!(Rank::Species.id() < Rank::Subspecies.id());
        assert!(Rank::Variety.is_infraspecific());
        assert!(!Rank::Species.is_infraspecific());
    }

    #[test]
    fn test_search_style_from_str() {
        assert_eq!("strict".parse::<SearchStyle>(), Ok(SearchStyle::Strict));
        assert_eq!("MATCH".parse::<SearchStyle>(), Ok(SearchStyle::Match));
        assert!("loose".parse::<SearchStyle>().is_err());
    }

    #[test]
    fn test_match_type_precedence() {
        assert!(MatchType::HigherOrder > MatchType::Vernacular);
        assert!(MatchType::Vernacular > MatchType::Fuzzy);
        assert!(MatchType::Fuzzy > MatchType::Phrase);
        assert!(MatchType::Phrase > MatchType::Canonical);
        assert!(MatchType::Canonical > MatchType::Exact);
    }

    #[test]
    fn test_match_type_serializes_as_label() {
        let json = serde_json::to_string(&MatchType::Vernacular).unwrap();
        assert_eq!(json, "\"vernacularMatch\"");
    }

    #[test]
    fn test_taxonomic_status_parse() {
        assert_eq!(
            TaxonomicStatus::parse("heterotypicSynonym"),
            TaxonomicStatus::Synonym
        );
        assert_eq!(TaxonomicStatus::parse("misapplied"), TaxonomicStatus::Misapplied);
        assert_eq!(TaxonomicStatus::parse("whatever"), TaxonomicStatus::Accepted);
        assert!(TaxonomicStatus::Misapplied.is_synonym());
        assert!(!TaxonomicStatus::Excluded.is_synonym());
    }
}
