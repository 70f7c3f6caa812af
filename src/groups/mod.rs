//! Species groups: curated, named buckets of taxa defined by tree position.
//!
//! A group is an ordered list of `[left, right)` intervals over the nested-set
//! numbering of the taxonomy, each either including or excluding the taxa it
//! covers. The first interval containing a position decides membership, so an
//! exclusion is declared before the inclusion it carves a hole in.
//!
//! Groups are resolved once at startup (see [`builder`]) and shared read-only.

pub mod builder;

use serde::{Deserialize, Serialize};

use crate::core::types::Rank;

/// One `[left, right)` range of a species group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInterval {
    pub left: u32,
    pub right: u32,
    pub included: bool,
}

impl GroupInterval {
    #[must_use]
    pub fn new(left: u32, right: u32, included: bool) -> Self {
        Self {
            left,
            right,
            included,
        }
    }

    #[must_use]
    pub fn contains(&self, position: u32) -> bool {
        self.left <= position && position < self.right
    }
}

/// A named group of taxa
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesGroup {
    pub name: String,
    pub rank: Rank,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub intervals: Vec<GroupInterval>,
}

impl SpeciesGroup {
    pub fn new(name: impl Into<String>, rank: Rank, intervals: Vec<GroupInterval>) -> Self {
        Self {
            name: name.into(),
            rank,
            parent: None,
            intervals,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Groups with a parent are reported as subgroups
    #[must_use]
    pub fn is_subgroup(&self) -> bool {
        self.parent.is_some()
    }

    /// Membership of a tree position, decided by the first interval containing it
    #[must_use]
    pub fn is_part_of(&self, position: u32) -> bool {
        self.intervals
            .iter()
            .find(|interval| interval.contains(position))
            .is_some_and(|interval| interval.included)
    }

    /// Whether two groups share taxa.
    ///
    /// Only interval endpoints are tested, so two groups whose shared range
    /// contains none of either group's endpoints are not detected.
    #[must_use]
    pub fn overlaps(&self, other: &SpeciesGroup) -> bool {
        let shared = |position: u32| self.is_part_of(position) && other.is_part_of(position);
        self.endpoints().any(shared) || other.endpoints().any(shared)
    }

    fn endpoints(&self) -> impl Iterator<Item = u32> + '_ {
        self.intervals
            .iter()
            .flat_map(|interval| [interval.left, interval.right])
    }
}

/// All configured species groups, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesGroups {
    groups: Vec<SpeciesGroup>,
}

impl SpeciesGroups {
    #[must_use]
    pub fn new(groups: Vec<SpeciesGroup>) -> Self {
        Self { groups }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpeciesGroup> {
        self.groups.iter()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SpeciesGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Whether a position belongs to the named group; unknown groups contain nothing
    #[must_use]
    pub fn is_part_of_group(&self, name: &str, position: u32) -> bool {
        self.get(name).is_some_and(|g| g.is_part_of(position))
    }

    /// Top-level groups containing a position
    #[must_use]
    pub fn groups_containing(&self, position: u32) -> Vec<String> {
        self.containing(position, false)
    }

    /// Subgroups containing a position
    #[must_use]
    pub fn subgroups_containing(&self, position: u32) -> Vec<String> {
        self.containing(position, true)
    }

    fn containing(&self, position: u32, subgroups: bool) -> Vec<String> {
        self.groups
            .iter()
            .filter(|g| g.is_subgroup() == subgroups && g.is_part_of(position))
            .map(|g| g.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carved() -> SpeciesGroup {
        SpeciesGroup::new(
            "Carved",
            Rank::Class,
            vec![
                GroupInterval::new(150, 250, false),
                GroupInterval::new(100, 400, true),
            ],
        )
    }

    #[test]
    fn test_exclusion_takes_precedence() {
        let group = carved();
        assert!(group.is_part_of(100));
        assert!(!group.is_part_of(200));
        assert!(group.is_part_of(300));
        assert!(!group.is_part_of(500));
    }

    #[test]
    fn test_interval_right_bound_is_exclusive() {
        let group = carved();
        assert!(group.is_part_of(399));
        assert!(!group.is_part_of(400));
        // 250 falls outside the exclusion and inside the inclusion
        assert!(group.is_part_of(250));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = carved();
        let inside_hole = SpeciesGroup::new("Hole", Rank::Order, vec![GroupInterval::new(160, 240, true)]);
        let straddling = SpeciesGroup::new("Straddle", Rank::Order, vec![GroupInterval::new(350, 450, true)]);
        let disjoint = SpeciesGroup::new("Far", Rank::Order, vec![GroupInterval::new(1000, 2000, true)]);

        for other in [&inside_hole, &straddling, &disjoint] {
            assert_eq!(a.overlaps(other), other.overlaps(&a), "{}", other.name);
        }
        assert!(!a.overlaps(&inside_hole));
        assert!(a.overlaps(&straddling));
        assert!(!a.overlaps(&disjoint));
    }

    #[test]
    fn test_groups_and_subgroups_in_declaration_order() {
        let groups = SpeciesGroups::new(vec![
            SpeciesGroup::new("Plants", Rank::Kingdom, vec![GroupInterval::new(1, 100, true)]),
            SpeciesGroup::new("Wattles", Rank::Genus, vec![GroupInterval::new(10, 20, true)])
                .with_parent("Plants"),
            SpeciesGroup::new("Dicots", Rank::Class, vec![GroupInterval::new(5, 50, true)]),
        ]);

        assert_eq!(groups.groups_containing(15), vec!["Plants", "Dicots"]);
        assert_eq!(groups.subgroups_containing(15), vec!["Wattles"]);
        assert!(groups.subgroups_containing(60).is_empty());
        assert!(groups.is_part_of_group("Dicots", 5));
        assert!(!groups.is_part_of_group("Fungi", 5));
    }
}
