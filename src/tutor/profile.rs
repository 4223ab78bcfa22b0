use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tutor::catalog::ConceptCatalog;
use crate::tutor::error::{TutorError, TutorResult};
use crate::tutor::mastery::{ConceptMetrics, MasteryEstimator, MasteryModel, OverallMetrics};
use crate::tutor::path::PathNode;
use crate::tutor::types::Interaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathChange {
    Generated,
    Adapted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSnapshot {
    pub change: PathChange,
    pub recorded_at: DateTime<Utc>,
    pub nodes: Vec<PathNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptStatistics {
    pub concept_id: String,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub accuracy: f64,
    pub avg_time_secs: f64,
    pub difficulty_faced: f64,
    pub current_streak: u32,
    pub mastery: f64,
}

/// Everything the engine knows about one student.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    student_id: String,
    metrics: BTreeMap<String, ConceptMetrics>,
    overall: OverallMetrics,
    history: Vec<Interaction>,
    current_path: Vec<PathNode>,
    path_history: Vec<PathSnapshot>,
}

impl LearnerProfile {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            ..Default::default()
        }
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    /// Folds one interaction into the counters and appends it to history.
    /// Callers are expected to have validated the concept id.
    pub fn record(&mut self, interaction: Interaction) {
        self.metrics
            .entry(interaction.concept_id.clone())
            .or_default()
            .record(
                interaction.correct,
                interaction.time_spent_secs,
                interaction.tier,
                interaction.timestamp,
            );
        self.overall
            .record(interaction.correct, interaction.time_spent_secs);
        self.history.push(interaction);
    }

    pub fn metrics_for(&self, concept: &str) -> Option<&ConceptMetrics> {
        self.metrics.get(concept)
    }

    pub fn overall(&self) -> &OverallMetrics {
        &self.overall
    }

    pub fn history(&self) -> &[Interaction] {
        &self.history
    }

    pub fn current_path(&self) -> &[PathNode] {
        &self.current_path
    }

    pub fn path_history(&self) -> &[PathSnapshot] {
        &self.path_history
    }

    pub fn set_path(&mut self, nodes: Vec<PathNode>, change: PathChange) {
        self.path_history.push(PathSnapshot {
            change,
            recorded_at: Utc::now(),
            nodes: nodes.clone(),
        });
        self.current_path = nodes;
    }

    /// Zeroed statistics for a concept the student never attempted.
    pub fn concept_statistics(&self, concept: &str, estimator: &MasteryEstimator) -> ConceptStatistics {
        let empty = ConceptMetrics::default();
        let metrics = self.metrics.get(concept).unwrap_or(&empty);
        ConceptStatistics {
            concept_id: concept.to_string(),
            total_attempts: metrics.attempts,
            correct_attempts: metrics.correct,
            accuracy: metrics.accuracy(),
            avg_time_secs: metrics.avg_time_secs(),
            difficulty_faced: metrics.avg_difficulty_faced,
            current_streak: metrics.streak,
            mastery: estimator.mastery(metrics),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub student_id: String,
    pub total_questions: u32,
    pub overall_accuracy: f64,
    pub average_mastery: f64,
    pub total_time_secs: u64,
    pub weak_concepts: Vec<String>,
    pub strong_concepts: Vec<String>,
}

/// Owns every learner profile, keyed by student id.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    catalog: Arc<ConceptCatalog>,
    profiles: BTreeMap<String, LearnerProfile>,
}

impl ProfileRegistry {
    pub fn new(catalog: Arc<ConceptCatalog>) -> Self {
        Self {
            catalog,
            profiles: BTreeMap::new(),
        }
    }

    pub fn get_or_create(&mut self, student_id: &str) -> &mut LearnerProfile {
        self.profiles
            .entry(student_id.to_string())
            .or_insert_with(|| LearnerProfile::new(student_id))
    }

    pub fn get(&self, student_id: &str) -> TutorResult<&LearnerProfile> {
        self.profiles
            .get(student_id)
            .ok_or_else(|| TutorError::UnknownStudent(student_id.to_string()))
    }

    pub fn get_mut(&mut self, student_id: &str) -> TutorResult<&mut LearnerProfile> {
        self.profiles
            .get_mut(student_id)
            .ok_or_else(|| TutorError::UnknownStudent(student_id.to_string()))
    }

    pub fn ingest(&mut self, interaction: Interaction) -> TutorResult<()> {
        self.catalog.require(&interaction.concept_id)?;
        tracing::debug!(
            student_id = %interaction.student_id,
            concept_id = %interaction.concept_id,
            correct = interaction.correct,
            "interaction ingested"
        );
        let student_id = interaction.student_id.clone();
        self.get_or_create(&student_id).record(interaction);
        Ok(())
    }

    /// Validates the whole log before touching any profile.
    pub fn ingest_all(&mut self, log: Vec<Interaction>) -> TutorResult<usize> {
        for interaction in &log {
            self.catalog.require(&interaction.concept_id)?;
        }
        let count = log.len();
        for interaction in log {
            let student_id = interaction.student_id.clone();
            self.get_or_create(&student_id).record(interaction);
        }
        tracing::info!(count, students = self.profiles.len(), "interaction log ingested");
        Ok(count)
    }

    pub fn students(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &LearnerProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn summaries(
        &self,
        model: &dyn MasteryModel,
        estimator: &MasteryEstimator,
    ) -> TutorResult<Vec<ProfileSummary>> {
        self.profiles
            .values()
            .map(|profile| {
                let knowledge = model.knowledge(profile)?;
                Ok(ProfileSummary {
                    student_id: profile.student_id.clone(),
                    total_questions: profile.overall.total_questions,
                    overall_accuracy: profile.overall.average_accuracy,
                    average_mastery: knowledge.mean(),
                    total_time_secs: profile.overall.total_time_secs,
                    weak_concepts: estimator.weak_concepts(&knowledge, 2),
                    strong_concepts: estimator.strong_concepts(&knowledge, 2),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tutor::mastery::EmpiricalMastery;
    use crate::tutor::types::DifficultyTier;

    fn interaction(student: &str, concept: &str, correct: bool) -> Interaction {
        Interaction {
            student_id: student.into(),
            concept_id: concept.into(),
            correct,
            time_spent_secs: 60,
            tier: DifficultyTier::Medium,
            timestamp: Utc::now(),
        }
    }

    fn registry() -> ProfileRegistry {
        ProfileRegistry::new(Arc::new(ConceptCatalog::from_ids(["a", "b"]).unwrap()))
    }

    #[test]
    fn ingest_creates_profiles_lazily() {
        let mut registry = registry();
        assert!(registry.get("s1").is_err());
        registry.ingest(interaction("s1", "a", true)).unwrap();
        registry.ingest(interaction("s1", "a", false)).unwrap();

        let profile = registry.get("s1").unwrap();
        assert_eq!(profile.history().len(), 2);
        assert_eq!(profile.metrics_for("a").unwrap().attempts, 2);
        assert_eq!(profile.overall().total_questions, 2);
        assert!(profile.metrics_for("b").is_none());
    }

    #[test]
    fn ingest_all_is_all_or_nothing() {
        let mut registry = registry();
        let log = vec![interaction("s1", "a", true), interaction("s2", "zzz", true)];
        let err = registry.ingest_all(log).unwrap_err();
        assert_eq!(err, TutorError::UnknownConcept("zzz".into()));
        assert!(registry.is_empty());
    }

    #[test]
    fn statistics_for_unattempted_concept_are_zero() {
        let profile = LearnerProfile::new("s1");
        let stats = profile.concept_statistics("b", &MasteryEstimator::default());
        assert_eq!(stats.total_attempts, 0);
        assert_eq!(stats.mastery, 0.0);
        assert_eq!(stats.accuracy, 0.0);
    }

    #[test]
    fn set_path_keeps_history() {
        let mut profile = LearnerProfile::new("s1");
        profile.set_path(Vec::new(), PathChange::Generated);
        profile.set_path(Vec::new(), PathChange::Adapted);
        assert_eq!(profile.path_history().len(), 2);
        assert_eq!(profile.path_history()[1].change, PathChange::Adapted);
    }

    #[test]
    fn summaries_report_weak_concepts() {
        let mut registry = registry();
        registry
            .ingest_all(vec![
                interaction("s1", "a", false),
                interaction("s1", "a", false),
                interaction("s1", "b", true),
            ])
            .unwrap();
        let catalog = Arc::new(ConceptCatalog::from_ids(["a", "b"]).unwrap());
        let model = EmpiricalMastery::new(catalog, MasteryEstimator::default());
        let summaries = registry
            .summaries(&model, &MasteryEstimator::default())
            .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].weak_concepts, vec!["a"]);
        assert_eq!(summaries[0].strong_concepts, vec!["b"]);
        assert_eq!(summaries[0].total_questions, 3);
    }
}
