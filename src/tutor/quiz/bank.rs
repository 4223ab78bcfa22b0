use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tutor::catalog::ConceptCatalog;
use crate::tutor::error::{TutorError, TutorResult};
use crate::tutor::types::{DifficultyTier, TaxonomyTier};

/// Static description of a question, as loaded from a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSpec {
    pub id: u32,
    pub concept_id: String,
    #[serde(default)]
    pub tier: DifficultyTier,
    #[serde(default)]
    pub taxonomy: TaxonomyTier,
    #[serde(default = "QuestionSpec::default_solve_secs")]
    pub estimated_secs: u32,
}

impl QuestionSpec {
    pub fn new(id: u32, concept_id: impl Into<String>, tier: DifficultyTier) -> Self {
        Self {
            id,
            concept_id: concept_id.into(),
            tier,
            taxonomy: TaxonomyTier::default(),
            estimated_secs: Self::default_solve_secs(),
        }
    }

    pub fn with_estimated_secs(mut self, secs: u32) -> Self {
        self.estimated_secs = secs;
        self
    }

    fn default_solve_secs() -> u32 {
        30
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub spec: QuestionSpec,
    pub attempts: u32,
    pub correct: u32,
    pub total_time_secs: u64,
}

impl Question {
    pub fn new(spec: QuestionSpec) -> Self {
        Self {
            spec,
            attempts: 0,
            correct: 0,
            total_time_secs: 0,
        }
    }

    pub fn id(&self) -> u32 {
        self.spec.id
    }

    pub fn concept_id(&self) -> &str {
        &self.spec.concept_id
    }

    pub fn tier(&self) -> DifficultyTier {
        self.spec.tier
    }

    /// Share of wrong answers; 0.5 until the question has been attempted.
    pub fn difficulty_index(&self) -> f64 {
        if self.attempts == 0 {
            return 0.5;
        }
        1.0 - f64::from(self.correct) / f64::from(self.attempts)
    }

    pub fn record(&mut self, correct: bool, time_spent_secs: u32) {
        self.attempts += 1;
        if correct {
            self.correct += 1;
        }
        self.total_time_secs += u64::from(time_spent_secs);
    }

    pub fn snapshot(&self) -> QuestionRecord {
        QuestionRecord {
            id: self.spec.id,
            concept_id: self.spec.concept_id.clone(),
            tier: self.spec.tier,
            taxonomy: self.spec.taxonomy,
            estimated_secs: self.spec.estimated_secs,
            attempts: self.attempts,
            difficulty_index: self.difficulty_index(),
        }
    }
}

/// Read-only view of a question handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: u32,
    pub concept_id: String,
    pub tier: DifficultyTier,
    pub taxonomy: TaxonomyTier,
    pub estimated_secs: u32,
    pub attempts: u32,
    pub difficulty_index: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatistics {
    pub count: usize,
    pub avg_difficulty_index: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankStatistics {
    pub total_questions: usize,
    pub by_tier: BTreeMap<DifficultyTier, GroupStatistics>,
    pub by_concept: BTreeMap<String, GroupStatistics>,
}

/// Question pool, in load order.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    catalog: Arc<ConceptCatalog>,
    questions: Vec<Question>,
    index: HashMap<u32, usize>,
}

impl QuestionBank {
    pub fn new(catalog: Arc<ConceptCatalog>, specs: Vec<QuestionSpec>) -> TutorResult<Self> {
        let mut index = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            catalog.require(&spec.concept_id)?;
            if index.insert(spec.id, i).is_some() {
                return Err(TutorError::DuplicateQuestion(spec.id));
            }
        }

        Ok(Self {
            catalog,
            questions: specs.into_iter().map(Question::new).collect(),
            index,
        })
    }

    pub fn catalog(&self) -> &ConceptCatalog {
        &self.catalog
    }

    pub fn get(&self, id: u32) -> TutorResult<&Question> {
        self.index
            .get(&id)
            .map(|&i| &self.questions[i])
            .ok_or(TutorError::UnknownQuestion(id))
    }

    pub fn get_mut(&mut self, id: u32) -> TutorResult<&mut Question> {
        match self.index.get(&id) {
            Some(&i) => Ok(&mut self.questions[i]),
            None => Err(TutorError::UnknownQuestion(id)),
        }
    }

    /// Questions for a concept, optionally restricted to one tier.
    pub fn by_concept(&self, concept: &str, tier: Option<DifficultyTier>) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| q.concept_id() == concept)
            .filter(|q| tier.map_or(true, |t| q.tier() == t))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn statistics(&self) -> BankStatistics {
        let mut stats = BankStatistics {
            total_questions: self.questions.len(),
            ..Default::default()
        };

        for q in &self.questions {
            let index = q.difficulty_index();
            for group in [
                stats.by_tier.entry(q.tier()).or_default(),
                stats.by_concept.entry(q.concept_id().to_string()).or_default(),
            ] {
                group.count += 1;
                group.avg_difficulty_index += index;
            }
        }

        for group in stats.by_tier.values_mut().chain(stats.by_concept.values_mut()) {
            group.avg_difficulty_index /= group.count as f64;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Arc<ConceptCatalog> {
        Arc::new(ConceptCatalog::from_ids(["a", "b"]).unwrap())
    }

    #[test]
    fn rejects_duplicate_and_unknown() {
        let err = QuestionBank::new(
            catalog(),
            vec![
                QuestionSpec::new(1, "a", DifficultyTier::Easy),
                QuestionSpec::new(1, "b", DifficultyTier::Hard),
            ],
        )
        .unwrap_err();
        assert_eq!(err, TutorError::DuplicateQuestion(1));

        let err = QuestionBank::new(catalog(), vec![QuestionSpec::new(1, "x", DifficultyTier::Easy)])
            .unwrap_err();
        assert_eq!(err, TutorError::UnknownConcept("x".into()));
    }

    #[test]
    fn difficulty_index_tracks_answers() {
        let mut q = Question::new(QuestionSpec::new(1, "a", DifficultyTier::Easy));
        assert_eq!(q.difficulty_index(), 0.5);
        q.record(true, 10);
        q.record(false, 20);
        q.record(false, 30);
        assert!((q.difficulty_index() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(q.total_time_secs, 60);
    }

    #[test]
    fn filters_and_statistics() {
        let mut bank = QuestionBank::new(
            catalog(),
            vec![
                QuestionSpec::new(1, "a", DifficultyTier::Easy),
                QuestionSpec::new(2, "a", DifficultyTier::Hard),
                QuestionSpec::new(3, "b", DifficultyTier::Hard),
            ],
        )
        .unwrap();
        assert_eq!(bank.by_concept("a", None).len(), 2);
        assert_eq!(bank.by_concept("a", Some(DifficultyTier::Hard))[0].id(), 2);
        assert!(bank.by_concept("a", Some(DifficultyTier::Medium)).is_empty());

        bank.get_mut(3).unwrap().record(true, 10);
        let stats = bank.statistics();
        assert_eq!(stats.total_questions, 3);
        assert_eq!(stats.by_tier[&DifficultyTier::Hard].count, 2);
        assert!((stats.by_tier[&DifficultyTier::Hard].avg_difficulty_index - 0.25).abs() < 1e-12);
        assert!((stats.by_concept["a"].avg_difficulty_index - 0.5).abs() < 1e-12);
        assert!(bank.get(99).is_err());
    }
}
