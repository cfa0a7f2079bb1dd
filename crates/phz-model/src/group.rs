//! Partition of SEDs (or any qualified names) into named groups.

use std::collections::HashMap;

use indexmap::IndexMap;
use phz_core::IndexError;
use phz_grid::QualifiedName;

/// Named, disjoint groups of qualified names, in declaration order.
///
/// Used to pick the luminosity function of an SED and to weight SEDs by
/// the size of their group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupManager {
    groups: IndexMap<String, Vec<QualifiedName>>,
    owner: HashMap<QualifiedName, usize>,
}

impl GroupManager {
    /// Build from `(group name, members)` pairs.
    ///
    /// Fails if a name belongs to two groups or a group name repeats.
    pub fn new<I, S>(groups: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = (S, Vec<QualifiedName>)>,
        S: Into<String>,
    {
        let mut manager = Self::default();
        for (name, members) in groups {
            let name = name.into();
            let position = manager.groups.len();
            for member in &members {
                if let Some(&other) = manager.owner.get(member) {
                    let other_name = manager
                        .groups
                        .get_index(other)
                        .map_or("", |(n, _)| n.as_str());
                    return Err(IndexError::InvalidAxis {
                        axis: "SED group",
                        reason: format!("{member} is in both {other_name} and {name}"),
                    });
                }
                manager.owner.insert(member.clone(), position);
            }
            if manager.groups.contains_key(&name) {
                return Err(IndexError::InvalidAxis {
                    axis: "SED group",
                    reason: format!("group {name} declared twice"),
                });
            }
            manager.groups.insert(name, members);
        }
        Ok(manager)
    }

    /// Name of the group containing `member`.
    pub fn group_of(&self, member: &QualifiedName) -> Result<&str, IndexError> {
        self.owner
            .get(member)
            .and_then(|&i| self.groups.get_index(i))
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| IndexError::ValueNotFound {
                axis: "SED group",
                value: member.to_string(),
            })
    }

    /// Members of group `name`.
    pub fn members(&self, name: &str) -> Result<&[QualifiedName], IndexError> {
        self.groups
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| IndexError::ValueNotFound {
                axis: "SED group",
                value: name.to_string(),
            })
    }

    /// Group names in declaration order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.keys().map(String::as_str)
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no group is declared.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<QualifiedName> {
        list.iter().map(|s| QualifiedName::from(*s)).collect()
    }

    fn manager() -> GroupManager {
        GroupManager::new([
            ("early", names(&["Ell", "S0"])),
            ("late", names(&["Sb", "Sc", "Irr"])),
        ])
        .unwrap()
    }

    #[test]
    fn lookup_both_ways() {
        let m = manager();
        assert_eq!(m.group_of(&"Sc".into()).unwrap(), "late");
        assert_eq!(m.members("early").unwrap(), names(&["Ell", "S0"]).as_slice());
        assert_eq!(m.group_names().collect::<Vec<_>>(), vec!["early", "late"]);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn unknown_names_fail() {
        let m = manager();
        match m.group_of(&"Starburst".into()) {
            Err(IndexError::ValueNotFound { .. }) => {}
            other => panic!("expected ValueNotFound, got {other:?}"),
        }
        assert!(m.members("mid").is_err());
    }

    #[test]
    fn overlapping_groups_rejected() {
        let r = GroupManager::new([("a", names(&["x", "y"])), ("b", names(&["y"]))]);
        match r {
            Err(IndexError::InvalidAxis { reason, .. }) => {
                assert!(reason.contains("y is in both a and b"), "{reason}")
            }
            other => panic!("expected InvalidAxis, got {other:?}"),
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn every_member_maps_back_to_its_group(assignment in prop::collection::vec(0usize..3, 1..20)) {
                let mut groups: Vec<(String, Vec<QualifiedName>)> =
                    (0..3).map(|g| (format!("g{g}"), Vec::new())).collect();
                for (i, g) in assignment.iter().enumerate() {
                    groups[*g].1.push(QualifiedName::from(format!("sed{i}")));
                }
                let m = GroupManager::new(groups.clone()).unwrap();
                for (i, g) in assignment.iter().enumerate() {
                    let sed = QualifiedName::from(format!("sed{i}"));
                    prop_assert_eq!(m.group_of(&sed).unwrap(), format!("g{g}"));
                }
                for (name, members) in &groups {
                    prop_assert_eq!(m.members(name).unwrap(), members.as_slice());
                }
            }
        }
    }
}
