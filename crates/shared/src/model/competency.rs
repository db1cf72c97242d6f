//! Competency - What a resource can do, and how well
//!
//! A competency is identified by its `(category, label)` pair. A resource
//! holds at most one proficiency level per pair; inserting the same pair
//! again replaces the level.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::ResourceId;

/// Ordinal proficiency level
///
/// Variant order is the ranking order: `Basic < Intermediate < Advanced < Expert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Basic,
    Intermediate,
    Advanced,
    Expert,
}

impl Proficiency {
    /// All levels, lowest first
    pub const ALL: [Proficiency; 4] = [
        Proficiency::Basic,
        Proficiency::Intermediate,
        Proficiency::Advanced,
        Proficiency::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Proficiency::Basic => "basic",
            Proficiency::Intermediate => "intermediate",
            Proficiency::Advanced => "advanced",
            Proficiency::Expert => "expert",
        }
    }
}

impl std::fmt::Display for Proficiency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `(category, label)` pair a competency is keyed on
///
/// Also used on its own as an opportunity requirement (a minimum bar with
/// no level attached).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompetencyKey {
    pub category: String,
    pub label: String,
}

impl CompetencyKey {
    pub fn new(category: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            label: label.into(),
        }
    }
}

impl std::fmt::Display for CompetencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.label)
    }
}

/// A single competency record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
    pub category: String,
    pub label: String,
    pub level: Proficiency,
}

impl Competency {
    pub fn new(category: impl Into<String>, label: impl Into<String>, level: Proficiency) -> Self {
        Self {
            category: category.into(),
            label: label.into(),
            level,
        }
    }

    pub fn key(&self) -> CompetencyKey {
        CompetencyKey::new(self.category.clone(), self.label.clone())
    }
}

/// Ordered set of competencies, unique per `(category, label)`
///
/// Serialized as a plain list of [`Competency`] records. Deserializing a
/// list that repeats a pair keeps the last level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Competency>", into = "Vec<Competency>")]
pub struct CompetencySet {
    entries: BTreeMap<CompetencyKey, Proficiency>,
}

impl CompetencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a competency, returning the level it replaced (if any)
    pub fn insert(&mut self, competency: Competency) -> Option<Proficiency> {
        let Competency {
            category,
            label,
            level,
        } = competency;
        self.entries.insert(CompetencyKey { category, label }, level)
    }

    pub fn level(&self, key: &CompetencyKey) -> Option<Proficiency> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &CompetencyKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in `(category, label)` order
    pub fn iter(&self) -> impl Iterator<Item = (&CompetencyKey, Proficiency)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }
}

impl From<Vec<Competency>> for CompetencySet {
    fn from(competencies: Vec<Competency>) -> Self {
        let mut set = Self::new();
        for competency in competencies {
            set.insert(competency);
        }
        set
    }
}

impl From<CompetencySet> for Vec<Competency> {
    fn from(set: CompetencySet) -> Self {
        set.entries
            .into_iter()
            .map(|(key, level)| Competency {
                category: key.category,
                label: key.label,
                level,
            })
            .collect()
    }
}

impl FromIterator<Competency> for CompetencySet {
    fn from_iter<I: IntoIterator<Item = Competency>>(iter: I) -> Self {
        let mut set = Self::new();
        for competency in iter {
            set.insert(competency);
        }
        set
    }
}

/// Resource - A person or unit whose competencies can be matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    pub display_name: String,
    #[serde(default)]
    pub competencies: CompetencySet,
}

impl Resource {
    pub fn new(id: ResourceId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            competencies: CompetencySet::new(),
        }
    }

    /// Builder: add (or replace) a competency
    pub fn with_competency(
        mut self,
        category: impl Into<String>,
        label: impl Into<String>,
        level: Proficiency,
    ) -> Self {
        self.competencies
            .insert(Competency::new(category, label, level));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proficiency_ordering() {
        assert!(Proficiency::Basic < Proficiency::Intermediate);
        assert!(Proficiency::Advanced < Proficiency::Expert);
        assert_eq!(Proficiency::ALL.iter().max(), Some(&Proficiency::Expert));
    }

    #[test]
    fn test_one_level_per_pair() {
        let resource = Resource::new(ResourceId::new("r-001"), "Alice")
            .with_competency("lang", "rust", Proficiency::Basic)
            .with_competency("lang", "rust", Proficiency::Expert);

        assert_eq!(resource.competencies.len(), 1);
        assert_eq!(
            resource.competencies.level(&CompetencyKey::new("lang", "rust")),
            Some(Proficiency::Expert)
        );
    }

    #[test]
    fn test_competency_set_iterates_in_key_order() {
        let set: CompetencySet = vec![
            Competency::new("lang", "rust", Proficiency::Advanced),
            Competency::new("domain", "banking", Proficiency::Basic),
        ]
        .into_iter()
        .collect();

        let keys: Vec<String> = set.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["domain/banking", "lang/rust"]);
    }

    #[test]
    fn test_resource_deserialization() {
        let json = r#"{
            "id": "r-007",
            "displayName": "Bob",
            "competencies": [
                {"category": "lang", "label": "go", "level": "basic"},
                {"category": "lang", "label": "go", "level": "advanced"}
            ]
        }"#;

        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.id.as_str(), "r-007");
        assert_eq!(
            resource.competencies.level(&CompetencyKey::new("lang", "go")),
            Some(Proficiency::Advanced)
        );
    }
}
