//! Immutable concept reference data.
//!
//! Built once at startup and shared by the mastery models, the path planner
//! and the question bank. Construction is the only place concept ids are
//! validated against each other.

use std::collections::HashMap;

use crate::tutor::error::{TutorError, TutorResult};
use crate::tutor::types::Concept;

#[derive(Debug, Clone, Default)]
pub struct ConceptCatalog {
    concepts: Vec<Concept>,
    index: HashMap<String, usize>,
}

impl ConceptCatalog {
    pub fn new(concepts: Vec<Concept>) -> TutorResult<Self> {
        let mut index = HashMap::with_capacity(concepts.len());
        for (i, concept) in concepts.iter().enumerate() {
            if !(0.0..=1.0).contains(&concept.difficulty) {
                return Err(TutorError::InvalidParameter {
                    name: "difficulty",
                    value: concept.difficulty,
                });
            }
            if index.insert(concept.id.clone(), i).is_some() {
                return Err(TutorError::DuplicateConcept(concept.id.clone()));
            }
        }

        for concept in &concepts {
            if let Some(missing) = concept
                .prerequisites
                .iter()
                .find(|p| !index.contains_key(p.as_str()))
            {
                return Err(TutorError::UnknownConcept(missing.clone()));
            }
        }

        Ok(Self { concepts, index })
    }

    /// Catalog of plain concepts with default difficulty, time and no
    /// prerequisites.
    pub fn from_ids<I, S>(ids: I) -> TutorResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ids.into_iter().map(Concept::new).collect())
    }

    pub fn get(&self, id: &str) -> TutorResult<&Concept> {
        self.index
            .get(id)
            .map(|&i| &self.concepts[i])
            .ok_or_else(|| TutorError::UnknownConcept(id.to_string()))
    }

    pub fn require(&self, id: &str) -> TutorResult<()> {
        self.get(id).map(|_| ())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Position of the concept in catalog order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.concepts.iter().map(|c| c.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}
