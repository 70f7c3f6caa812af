use serde::{Deserialize, Serialize};

use crate::core::types::{NameType, Rank, TaxonomicStatus};

/// Higher classification of a concept, one name and identifier per Linnaean rank
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HigherClassification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kingdom: Option<String>,
    #[serde(rename = "kingdomID", default, skip_serializing_if = "Option::is_none")]
    pub kingdom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phylum: Option<String>,
    #[serde(rename = "phylumID", default, skip_serializing_if = "Option::is_none")]
    pub phylum_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(rename = "classID", default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(rename = "orderID", default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(rename = "familyID", default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    #[serde(rename = "genusID", default, skip_serializing_if = "Option::is_none")]
    pub genus_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(rename = "speciesID", default, skip_serializing_if = "Option::is_none")]
    pub species_id: Option<String>,
}

impl HigherClassification {
    /// Name at a Linnaean rank, `None` for ranks the classification does not carry
    #[must_use]
    pub fn name_at(&self, rank: Rank) -> Option<&str> {
        match rank {
            Rank::Kingdom => self.kingdom.as_deref(),
            Rank::Phylum => self.phylum.as_deref(),
            Rank::Class => self.class.as_deref(),
            Rank::Order => self.order.as_deref(),
            Rank::Family => self.family.as_deref(),
            Rank::Genus => self.genus.as_deref(),
            Rank::Species => self.species.as_deref(),
            _ => None,
        }
    }

    /// Identifier at a Linnaean rank
    #[must_use]
    pub fn id_at(&self, rank: Rank) -> Option<&str> {
        match rank {
            Rank::Kingdom => self.kingdom_id.as_deref(),
            Rank::Phylum => self.phylum_id.as_deref(),
            Rank::Class => self.class_id.as_deref(),
            Rank::Order => self.order_id.as_deref(),
            Rank::Family => self.family_id.as_deref(),
            Rank::Genus => self.genus_id.as_deref(),
            Rank::Species => self.species_id.as_deref(),
            _ => None,
        }
    }

    /// Set the name and identifier at a rank. Non-Linnaean ranks are ignored.
    pub fn set(&mut self, rank: Rank, name: &str, id: &str) {
        let (name_slot, id_slot) = match rank {
            Rank::Kingdom => (&mut self.kingdom, &mut self.kingdom_id),
            Rank::Phylum => (&mut self.phylum, &mut self.phylum_id),
            Rank::Class => (&mut self.class, &mut self.class_id),
            Rank::Order => (&mut self.order, &mut self.order_id),
            Rank::Family => (&mut self.family, &mut self.family_id),
            Rank::Genus => (&mut self.genus, &mut self.genus_id),
            Rank::Species => (&mut self.species, &mut self.species_id),
            _ => return,
        };
        *name_slot = Some(name.to_string());
        *id_slot = Some(id.to_string());
    }
}

/// A resolved taxon concept as reported by a classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonConcept {
    #[serde(rename = "taxonID")]
    pub taxon_id: String,

    pub scientific_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorship: Option<String>,

    pub rank: Rank,

    #[serde(default)]
    pub status: TaxonomicStatus,

    #[serde(default)]
    pub name_type: NameType,

    /// Accepted concept for synonyms and misapplied names
    #[serde(rename = "acceptedID", default, skip_serializing_if = "Option::is_none")]
    pub accepted_id: Option<String>,

    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Nested-set position; synonyms carry their accepted concept's position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<u32>,

    #[serde(default)]
    pub classification: HigherClassification,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vernacular_name: Option<String>,
}

impl TaxonConcept {
    pub fn new(taxon_id: impl Into<String>, scientific_name: impl Into<String>, rank: Rank) -> Self {
        Self {
            taxon_id: taxon_id.into(),
            scientific_name: scientific_name.into(),
            authorship: None,
            rank,
            status: TaxonomicStatus::Accepted,
            name_type: NameType::Scientific,
            accepted_id: None,
            parent_id: None,
            left: None,
            right: None,
            classification: HigherClassification::default(),
            vernacular_name: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, left: u32, right: u32) -> Self {
        self.left = Some(left);
        self.right = Some(right);
        self
    }

    #[must_use]
    pub fn with_classification(mut self, classification: HigherClassification) -> Self {
        self.classification = classification;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: TaxonomicStatus, accepted_id: Option<String>) -> Self {
        self.status = status;
        self.accepted_id = accepted_id;
        self
    }

    #[must_use]
    pub fn is_synonym(&self) -> bool {
        self.status.is_synonym()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_read_classification() {
        let mut hc = HigherClassification::default();
        hc.set(Rank::Kingdom, "Plantae", "K1");
        hc.set(Rank::Genus, "Acacia", "G1");
        hc.set(Rank::Subspecies, "ignored", "X");

        assert_eq!(hc.name_at(Rank::Kingdom), Some("Plantae"));
        assert_eq!(hc.id_at(Rank::Genus), Some("G1"));
        assert_eq!(hc.name_at(Rank::Family), None);
        assert_eq!(hc.name_at(Rank::Subspecies), None);
    }

    #[test]
    fn test_classification_serializes_rank_ids() {
        let mut hc = HigherClassification::default();
        hc.set(Rank::Family, "Fabaceae", "F1");
        let json = serde_json::to_value(&hc).unwrap();
        assert_eq!(json["family"], "Fabaceae");
        assert_eq!(json["familyID"], "F1");
        assert!(json.get("kingdom").is_none());
    }
}
