use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum DifficultyTier {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Numeric score on the 1-3 scale used by question selection.
    pub fn score(&self) -> f64 {
        match self {
            Self::Easy => 1.0,
            Self::Medium => 2.0,
            Self::Hard => 3.0,
        }
    }

    pub fn harder(&self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            _ => Self::Hard,
        }
    }

    pub fn easier(&self) -> Self {
        match self {
            Self::Hard => Self::Medium,
            _ => Self::Easy,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "easy" => Self::Easy,
            "hard" => Self::Hard,
            _ => Self::Medium,
        }
    }
}

/// Six ordered cognitive-complexity levels, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum TaxonomyTier {
    Remember,
    #[default]
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl TaxonomyTier {
    pub fn from_mastery(mastery: f64) -> Self {
        if mastery < 0.2 {
            Self::Remember
        } else if mastery < 0.4 {
            Self::Understand
        } else if mastery < 0.6 {
            Self::Apply
        } else if mastery < 0.75 {
            Self::Analyze
        } else if mastery < 0.9 {
            Self::Evaluate
        } else {
            Self::Create
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Self::Remember => 1,
            Self::Understand => 2,
            Self::Apply => 3,
            Self::Analyze => 4,
            Self::Evaluate => 5,
            Self::Create => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remember => "remember",
            Self::Understand => "understand",
            Self::Apply => "apply",
            Self::Analyze => "analyze",
            Self::Evaluate => "evaluate",
            Self::Create => "create",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "remember" => Self::Remember,
            "apply" => Self::Apply,
            "analyze" => Self::Analyze,
            "evaluate" => Self::Evaluate,
            "create" => Self::Create,
            _ => Self::Understand,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub id: String,
    #[serde(default = "Concept::default_difficulty")]
    pub difficulty: f64,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default = "Concept::default_minutes")]
    pub estimated_minutes: u32,
}

impl Concept {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            difficulty: Self::default_difficulty(),
            prerequisites: Vec::new(),
            estimated_minutes: Self::default_minutes(),
        }
    }

    pub fn with_difficulty(mut self, difficulty: f64) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_estimated_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = minutes;
        self
    }

    fn default_difficulty() -> f64 {
        0.5
    }

    fn default_minutes() -> u32 {
        30
    }
}

/// One answered question. The atomic event consumed by both mastery models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub student_id: String,
    pub concept_id: String,
    pub correct: bool,
    pub time_spent_secs: u32,
    #[serde(default)]
    pub tier: DifficultyTier,
    pub timestamp: DateTime<Utc>,
}

/// Concept → mastery map. Values are clamped to [0, 1] on insert and
/// iteration follows insertion order.
///
/// Serialized as a JSON object in insertion order; deserialized values go
/// through the same clamp as [`KnowledgeVector::set`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeVector {
    entries: Vec<(String, f64)>,
}

impl KnowledgeVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut vector = Self::new();
        for (concept, mastery) in pairs {
            vector.set(concept, mastery);
        }
        vector
    }

    pub fn set(&mut self, concept: impl Into<String>, mastery: f64) {
        let concept = concept.into();
        let mastery = clamp_unit(mastery);
        match self.entries.iter_mut().find(|(c, _)| *c == concept) {
            Some(entry) => entry.1 = mastery,
            None => self.entries.push((concept, mastery)),
        }
    }

    pub fn get(&self, concept: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| c == concept)
            .map(|(_, m)| *m)
    }

    pub fn mastery_or(&self, concept: &str, default: f64) -> f64 {
        self.get(concept).unwrap_or(default)
    }

    pub fn contains(&self, concept: &str) -> bool {
        self.get(concept).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(c, m)| (c.as_str(), *m))
    }

    pub fn concepts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.entries.iter().map(|(_, m)| m).sum::<f64>() / self.entries.len() as f64
    }
}

impl Serialize for KnowledgeVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (concept, mastery) in &self.entries {
            map.serialize_entry(concept, mastery)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for KnowledgeVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KnowledgeVisitor;

        impl<'de> Visitor<'de> for KnowledgeVisitor {
            type Value = KnowledgeVector;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of concept id to mastery")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut vector = KnowledgeVector::new();
                while let Some((concept, mastery)) = access.next_entry::<String, f64>()? {
                    vector.set(concept, mastery);
                }
                Ok(vector)
            }
        }

        deserializer.deserialize_map(KnowledgeVisitor)
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
