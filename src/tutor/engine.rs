//! Library facade that wires catalog, mastery models, planner, question
//! bank, profiles and quiz sessions together.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::tutor::catalog::ConceptCatalog;
use crate::tutor::config::{MasterySource, TutorConfig};
use crate::tutor::error::TutorResult;
use crate::tutor::mastery::{
    concept_progress, difficulty_adaptation, path_effectiveness, prediction_accuracy,
    AdaptationReport, ConceptProgress, EmpiricalMastery, KnowledgeStateTracer, KnowledgeTrace,
    MasteryEstimator, MasteryModel, PredictionReport, TracedMastery,
};
use crate::tutor::path::{LearningPathPlanner, PathNode, PathRequest};
use crate::tutor::profile::{
    ConceptStatistics, LearnerProfile, PathChange, ProfileRegistry, ProfileSummary,
};
use crate::tutor::quiz::{
    BankStatistics, QuestionBank, QuestionRecord, QuestionSpec, QuizSession, QuizStatistics,
    ResponseOutcome,
};
use crate::tutor::types::{DifficultyTier, Interaction, KnowledgeVector};

pub struct TutorEngine {
    catalog: Arc<ConceptCatalog>,
    config: TutorConfig,
    empirical: EmpiricalMastery,
    traced: TracedMastery,
    planner: LearningPathPlanner,
    bank: QuestionBank,
    registry: ProfileRegistry,
    sessions: HashMap<String, QuizSession>,
}

impl TutorEngine {
    pub fn new(
        catalog: impl Into<Arc<ConceptCatalog>>,
        questions: Vec<QuestionSpec>,
        config: TutorConfig,
    ) -> TutorResult<Self> {
        config.validate()?;
        let catalog = catalog.into();

        let estimator = MasteryEstimator::new(config.mastery.clone());
        let tracer = KnowledgeStateTracer::new(catalog.clone(), config.tracing.clone())?;
        let bank = QuestionBank::new(catalog.clone(), questions)?;

        tracing::info!(
            concepts = catalog.len(),
            questions = bank.len(),
            mastery_source = config.mastery_source.as_str(),
            "tutor engine ready"
        );

        Ok(Self {
            empirical: EmpiricalMastery::new(catalog.clone(), estimator),
            traced: TracedMastery::new(tracer),
            planner: LearningPathPlanner::new(catalog.clone(), config.path.clone()),
            registry: ProfileRegistry::new(catalog.clone()),
            sessions: HashMap::new(),
            catalog,
            config,
            bank,
        })
    }

    pub fn catalog(&self) -> &ConceptCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    pub fn estimator(&self) -> &MasteryEstimator {
        self.empirical.estimator()
    }

    pub fn tracer(&self) -> &KnowledgeStateTracer {
        self.traced.tracer()
    }

    pub fn planner(&self) -> &LearningPathPlanner {
        &self.planner
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn model(&self, source: MasterySource) -> &dyn MasteryModel {
        match source {
            MasterySource::Empirical => &self.empirical,
            MasterySource::Traced => &self.traced,
        }
    }

    // ---- ingestion ----

    pub fn ingest(&mut self, interaction: Interaction) -> TutorResult<()> {
        self.registry.ingest(interaction)
    }

    pub fn ingest_all(&mut self, log: Vec<Interaction>) -> TutorResult<usize> {
        self.registry.ingest_all(log)
    }

    pub fn profile(&self, student_id: &str) -> TutorResult<&LearnerProfile> {
        self.registry.get(student_id)
    }

    // ---- mastery ----

    /// Mastery vector for a student; `None` uses the configured source.
    pub fn knowledge(
        &self,
        student_id: &str,
        source: Option<MasterySource>,
    ) -> TutorResult<KnowledgeVector> {
        let profile = self.registry.get(student_id)?;
        self.model(source.unwrap_or(self.config.mastery_source))
            .knowledge(profile)
    }

    pub fn weak_concepts(&self, student_id: &str, n: usize) -> TutorResult<Vec<String>> {
        let knowledge = self.knowledge(student_id, None)?;
        Ok(self.estimator().weak_concepts(&knowledge, n))
    }

    pub fn strong_concepts(&self, student_id: &str, n: usize) -> TutorResult<Vec<String>> {
        let knowledge = self.knowledge(student_id, None)?;
        Ok(self.estimator().strong_concepts(&knowledge, n))
    }

    pub fn concept_statistics(
        &self,
        student_id: &str,
        concept: &str,
    ) -> TutorResult<ConceptStatistics> {
        self.catalog.require(concept)?;
        let profile = self.registry.get(student_id)?;
        Ok(profile.concept_statistics(concept, self.estimator()))
    }

    pub fn summaries(&self) -> TutorResult<Vec<ProfileSummary>> {
        self.registry
            .summaries(self.model(self.config.mastery_source), self.estimator())
    }

    pub fn trace(&self, student_id: &str) -> TutorResult<KnowledgeTrace> {
        let profile = self.registry.get(student_id)?;
        self.tracer().trace(profile.history())
    }

    /// Traces every student's history in parallel.
    pub fn trace_all(&self) -> TutorResult<BTreeMap<String, KnowledgeTrace>> {
        let log: Vec<Interaction> = self
            .registry
            .profiles()
            .flat_map(|p| p.history().iter().cloned())
            .collect();
        self.tracer().trace_all(&log)
    }

    pub fn prediction_accuracy(
        &self,
        student_id: &str,
        lookahead: usize,
    ) -> TutorResult<PredictionReport> {
        let profile = self.registry.get(student_id)?;
        prediction_accuracy(self.tracer(), profile.history(), lookahead)
    }

    pub fn concept_progress(&self, student_id: &str) -> TutorResult<BTreeMap<String, ConceptProgress>> {
        let profile = self.registry.get(student_id)?;
        Ok(concept_progress(profile.history()))
    }

    // ---- learning paths ----

    /// Plans a fresh path from the student's current knowledge and stores
    /// it on the profile. Students without history start from zero.
    pub fn create_path(
        &mut self,
        student_id: &str,
        request: &PathRequest,
    ) -> TutorResult<Vec<PathNode>> {
        let profile = self.registry.get_or_create(student_id);
        let model: &dyn MasteryModel = match self.config.mastery_source {
            MasterySource::Empirical => &self.empirical,
            MasterySource::Traced => &self.traced,
        };
        let knowledge = model.knowledge(profile)?;
        let weak = self.empirical.estimator().weak_concepts(&knowledge, 3);
        let nodes = self.planner.generate_path(&knowledge, &weak, request)?;

        tracing::info!(student_id, nodes = nodes.len(), "learning path created");
        profile.set_path(nodes.clone(), PathChange::Generated);
        Ok(nodes)
    }

    /// Re-reads mastery for the stored path and records the adapted copy.
    pub fn update_path(&mut self, student_id: &str) -> TutorResult<Vec<PathNode>> {
        let knowledge = self.knowledge(student_id, None)?;
        let profile = self.registry.get_mut(student_id)?;
        let nodes = self.planner.adapt_path(profile.current_path(), &knowledge);
        tracing::debug!(student_id, nodes = nodes.len(), "learning path adapted");
        profile.set_path(nodes.clone(), PathChange::Adapted);
        Ok(nodes)
    }

    pub fn next_concept(&self, student_id: &str) -> TutorResult<Option<PathNode>> {
        let knowledge = self.knowledge(student_id, None)?;
        let profile = self.registry.get(student_id)?;
        Ok(self
            .planner
            .next_concept(profile.current_path(), &knowledge)
            .cloned())
    }

    pub fn path_duration(&self, student_id: &str) -> TutorResult<u32> {
        let profile = self.registry.get(student_id)?;
        Ok(self.planner.estimate_duration(profile.current_path()))
    }

    /// Mean mastery over the concepts of every stored path, judged with the
    /// configured mastery source.
    pub fn path_effectiveness(&self) -> TutorResult<f64> {
        let mut scored = Vec::new();
        for profile in self.registry.profiles() {
            if profile.current_path().is_empty() {
                continue;
            }
            let knowledge = self.model(self.config.mastery_source).knowledge(profile)?;
            scored.push((profile.current_path(), knowledge));
        }
        Ok(path_effectiveness(
            scored.iter().map(|(path, knowledge)| (*path, knowledge)),
        ))
    }

    // ---- quizzes ----

    /// Starts (or restarts) the student's quiz session.
    pub fn start_quiz(&mut self, student_id: &str) -> Uuid {
        let session = self.session_mut(student_id);
        session.start_new();
        session.id()
    }

    pub fn select_question(
        &mut self,
        student_id: &str,
        concept: &str,
        mastery: f64,
        previous_correct: Option<bool>,
    ) -> TutorResult<QuestionRecord> {
        let bank = &self.bank;
        let session = Self::session_entry(&mut self.sessions, &self.config, student_id);
        session.select_next_question(bank, concept, mastery, previous_correct)
    }

    pub fn select_question_at_tier(
        &mut self,
        student_id: &str,
        concept: &str,
        tier: DifficultyTier,
        mastery: f64,
        previous_correct: Option<bool>,
    ) -> TutorResult<QuestionRecord> {
        let bank = &self.bank;
        let session = Self::session_entry(&mut self.sessions, &self.config, student_id);
        session.select_at_tier(bank, concept, tier, mastery, previous_correct)
    }

    /// Records the answer in the session and the bank, then folds it into
    /// the student's profile as a new interaction.
    pub fn record_response(
        &mut self,
        student_id: &str,
        question_id: u32,
        correct: bool,
        time_spent_secs: u32,
    ) -> TutorResult<ResponseOutcome> {
        let session = Self::session_entry(&mut self.sessions, &self.config, student_id);
        let outcome = session.record_response(&mut self.bank, question_id, correct, time_spent_secs)?;

        self.registry.ingest(Interaction {
            student_id: student_id.to_string(),
            concept_id: outcome.record.concept_id.clone(),
            correct,
            time_spent_secs,
            tier: outcome.record.tier,
            timestamp: Utc::now(),
        })?;
        Ok(outcome)
    }

    pub fn should_continue(&self, student_id: &str) -> bool {
        self.sessions
            .get(student_id)
            .map_or(true, QuizSession::should_continue)
    }

    pub fn quiz_statistics(&self, student_id: &str) -> QuizStatistics {
        self.sessions
            .get(student_id)
            .map(QuizSession::statistics)
            .unwrap_or_default()
    }

    pub fn misconceptions(&self, student_id: &str) -> BTreeMap<String, Vec<u32>> {
        self.sessions
            .get(student_id)
            .map(QuizSession::misconceptions)
            .unwrap_or_default()
    }

    /// Direction of tier changes over the current session's responses.
    pub fn difficulty_adaptation(&self, student_id: &str) -> AdaptationReport {
        self.sessions
            .get(student_id)
            .map(|s| difficulty_adaptation(s.responses()))
            .unwrap_or_default()
    }

    pub fn session(&self, student_id: &str) -> Option<&QuizSession> {
        self.sessions.get(student_id)
    }

    pub fn bank_statistics(&self) -> BankStatistics {
        self.bank.statistics()
    }

    fn session_mut(&mut self, student_id: &str) -> &mut QuizSession {
        Self::session_entry(&mut self.sessions, &self.config, student_id)
    }

    fn session_entry<'a>(
        sessions: &'a mut HashMap<String, QuizSession>,
        config: &TutorConfig,
        student_id: &str,
    ) -> &'a mut QuizSession {
        sessions
            .entry(student_id.to_string())
            .or_insert_with(|| QuizSession::new(student_id, config.quiz.clone()))
    }
}
