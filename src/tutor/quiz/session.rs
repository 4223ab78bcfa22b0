//! One student's quiz run: question choice, response bookkeeping and the
//! stop rule.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tutor::config::QuizParams;
use crate::tutor::error::{TutorError, TutorResult};
use crate::tutor::quiz::bank::{Question, QuestionBank, QuestionRecord};
use crate::tutor::quiz::difficulty::DifficultyAdaptor;
use crate::tutor::types::DifficultyTier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub question_id: u32,
    pub student_id: String,
    pub correct: bool,
    pub time_spent_secs: u32,
    pub concept_id: String,
    pub tier: DifficultyTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaceNote {
    Slow,
    OnPace,
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    Continue,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseOutcome {
    pub record: ResponseRecord,
    pub next_tier: DifficultyTier,
    pub pace: PaceNote,
    pub next_action: NextAction,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptPerformance {
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStatistics {
    pub total_questions: usize,
    pub correct_answers: usize,
    pub accuracy: f64,
    pub avg_time_secs: f64,
    /// Correct answers at the end of the session, unbroken.
    #[serde(default)]
    pub current_streak: usize,
    pub concept_performance: BTreeMap<String, ConceptPerformance>,
    pub tier_distribution: BTreeMap<DifficultyTier, usize>,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    id: Uuid,
    student_id: String,
    params: QuizParams,
    started_at: DateTime<Utc>,
    presented: Vec<u32>,
    responses: Vec<ResponseRecord>,
    adaptor: DifficultyAdaptor,
}

impl QuizSession {
    pub fn new(student_id: impl Into<String>, params: QuizParams) -> Self {
        let adaptor = DifficultyAdaptor::new(&params);
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            params,
            started_at: Utc::now(),
            presented: Vec::new(),
            responses: Vec::new(),
            adaptor,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn presented(&self) -> &[u32] {
        &self.presented
    }

    pub fn responses(&self) -> &[ResponseRecord] {
        &self.responses
    }

    pub fn current_tier(&self) -> DifficultyTier {
        self.adaptor.current()
    }

    /// Discards presented questions, responses and tier history.
    pub fn start_new(&mut self) {
        self.id = Uuid::new_v4();
        self.started_at = Utc::now();
        self.presented.clear();
        self.responses.clear();
        self.adaptor.reset(self.params.initial_tier);
        tracing::debug!(student_id = %self.student_id, session_id = %self.id, "quiz session started");
    }

    pub fn select_next_question(
        &mut self,
        bank: &QuestionBank,
        concept: &str,
        mastery: f64,
        previous_correct: Option<bool>,
    ) -> TutorResult<QuestionRecord> {
        self.select(bank, concept, None, mastery, previous_correct)
    }

    /// Like [`select_next_question`](Self::select_next_question) but only
    /// considers questions of one tier. An empty tier is an error; callers
    /// decide whether to widen.
    pub fn select_at_tier(
        &mut self,
        bank: &QuestionBank,
        concept: &str,
        tier: DifficultyTier,
        mastery: f64,
        previous_correct: Option<bool>,
    ) -> TutorResult<QuestionRecord> {
        self.select(bank, concept, Some(tier), mastery, previous_correct)
    }

    fn select(
        &mut self,
        bank: &QuestionBank,
        concept: &str,
        tier: Option<DifficultyTier>,
        mastery: f64,
        previous_correct: Option<bool>,
    ) -> TutorResult<QuestionRecord> {
        bank.catalog().require(concept)?;

        let pool = bank.by_concept(concept, tier);
        if pool.is_empty() {
            return Err(TutorError::EmptyQuestionPool {
                concept: concept.to_string(),
                tier,
            });
        }

        let unseen: Vec<&Question> = pool
            .iter()
            .copied()
            .filter(|q| !self.presented.contains(&q.id()))
            .collect();
        let mut candidates = if unseen.is_empty() { pool } else { unseen };

        match previous_correct {
            Some(true) => candidates.sort_by(|a, b| b.tier().score().total_cmp(&a.tier().score())),
            Some(false) => candidates.sort_by(|a, b| a.tier().score().total_cmp(&b.tier().score())),
            None => {
                let target = mastery * 3.0;
                candidates.sort_by(|a, b| {
                    (a.tier().score() - target)
                        .abs()
                        .total_cmp(&(b.tier().score() - target).abs())
                });
            }
        }

        let chosen = candidates[0];
        self.presented.push(chosen.id());
        Ok(chosen.snapshot())
    }

    pub fn record_response(
        &mut self,
        bank: &mut QuestionBank,
        question_id: u32,
        correct: bool,
        time_spent_secs: u32,
    ) -> TutorResult<ResponseOutcome> {
        let question = bank.get_mut(question_id)?;
        question.record(correct, time_spent_secs);

        let record = ResponseRecord {
            question_id,
            student_id: self.student_id.clone(),
            correct,
            time_spent_secs,
            concept_id: question.concept_id().to_string(),
            tier: question.tier(),
        };
        let pace = self.pace(time_spent_secs, question.spec.estimated_secs);
        self.responses.push(record.clone());

        let next_tier = self.adaptor.observe(if correct { 1.0 } else { 0.0 });
        let next_action = if self.should_continue() {
            NextAction::Continue
        } else {
            tracing::info!(
                student_id = %self.student_id,
                session_id = %self.id,
                responses = self.responses.len(),
                "quiz complete"
            );
            NextAction::Complete
        };

        Ok(ResponseOutcome {
            record,
            next_tier,
            pace,
            next_action,
        })
    }

    /// Stops at the question cap; otherwise keeps going until enough
    /// answers are in and recent accuracy has settled outside the
    /// convergence band.
    pub fn should_continue(&self) -> bool {
        let n = self.responses.len();
        if n >= self.params.max_questions {
            return false;
        }
        if n < self.params.min_responses {
            return true;
        }

        let recent = &self.responses[n.saturating_sub(self.params.accuracy_window)..];
        let accuracy = recent.iter().filter(|r| r.correct).count() as f64 / recent.len() as f64;
        accuracy > self.params.converge_low && accuracy < self.params.converge_high
    }

    pub fn statistics(&self) -> QuizStatistics {
        let total = self.responses.len();
        if total == 0 {
            return QuizStatistics::default();
        }

        let mut stats = QuizStatistics {
            total_questions: total,
            ..Default::default()
        };
        let mut total_time = 0u64;

        for r in &self.responses {
            total_time += u64::from(r.time_spent_secs);
            if r.correct {
                stats.correct_answers += 1;
            }
            let perf = stats
                .concept_performance
                .entry(r.concept_id.clone())
                .or_default();
            perf.total += 1;
            if r.correct {
                perf.correct += 1;
            }
            *stats.tier_distribution.entry(r.tier).or_default() += 1;
        }

        for perf in stats.concept_performance.values_mut() {
            perf.accuracy = perf.correct as f64 / perf.total as f64;
        }
        stats.accuracy = stats.correct_answers as f64 / total as f64;
        stats.avg_time_secs = total_time as f64 / total as f64;
        stats.current_streak = self.responses.iter().rev().take_while(|r| r.correct).count();
        stats
    }

    /// Concept → ids of questions answered incorrectly, in answer order.
    pub fn misconceptions(&self) -> BTreeMap<String, Vec<u32>> {
        let mut out: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for r in self.responses.iter().filter(|r| !r.correct) {
            out.entry(r.concept_id.clone()).or_default().push(r.question_id);
        }
        out
    }

    fn pace(&self, time_spent_secs: u32, estimated_secs: u32) -> PaceNote {
        let spent = f64::from(time_spent_secs);
        let estimate = f64::from(estimated_secs);
        if spent > estimate * self.params.slow_factor {
            PaceNote::Slow
        } else if spent < estimate * self.params.fast_factor {
            PaceNote::Fast
        } else {
            PaceNote::OnPace
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tutor::catalog::ConceptCatalog;
    use crate::tutor::quiz::bank::QuestionSpec;
    use std::sync::Arc;

    fn bank() -> QuestionBank {
        let catalog = Arc::new(ConceptCatalog::from_ids(["a", "b"]).unwrap());
        QuestionBank::new(
            catalog,
            vec![
                QuestionSpec::new(1, "a", DifficultyTier::Easy),
                QuestionSpec::new(2, "a", DifficultyTier::Medium),
                QuestionSpec::new(3, "a", DifficultyTier::Hard),
            ],
        )
        .unwrap()
    }

    fn session() -> QuizSession {
        QuizSession::new("s1", QuizParams::default())
    }

    #[test]
    fn selection_follows_previous_answer() {
        let bank = bank();
        let mut s = session();
        assert_eq!(s.select_next_question(&bank, "a", 0.5, Some(true)).unwrap().id, 3);
        assert_eq!(s.select_next_question(&bank, "a", 0.5, Some(false)).unwrap().id, 1);
        assert_eq!(s.select_next_question(&bank, "a", 0.5, None).unwrap().id, 2);
        // everything seen: falls back to the whole pool
        assert_eq!(s.select_next_question(&bank, "a", 0.9, None).unwrap().id, 3);
        assert_eq!(s.presented(), &[3, 1, 2, 3]);
    }

    #[test]
    fn mastery_targets_tier_score() {
        let bank = bank();
        let mut s = session();
        // 0.2 * 3 = 0.6, closest to Easy
        assert_eq!(s.select_next_question(&bank, "a", 0.2, None).unwrap().id, 1);
    }

    #[test]
    fn empty_pool_and_unknown_concept() {
        let bank = bank();
        let mut s = session();
        assert_eq!(
            s.select_next_question(&bank, "b", 0.5, None).unwrap_err(),
            TutorError::EmptyQuestionPool {
                concept: "b".into(),
                tier: None
            }
        );
        assert_eq!(
            s.select_next_question(&bank, "zz", 0.5, None).unwrap_err(),
            TutorError::UnknownConcept("zz".into())
        );
        assert!(s.presented().is_empty());
    }

    #[test]
    fn tier_filter_does_not_widen() {
        let catalog = Arc::new(ConceptCatalog::from_ids(["a"]).unwrap());
        let bank = QuestionBank::new(catalog, vec![QuestionSpec::new(1, "a", DifficultyTier::Easy)])
            .unwrap();
        let mut s = session();
        let err = s
            .select_at_tier(&bank, "a", DifficultyTier::Hard, 0.5, None)
            .unwrap_err();
        assert_eq!(
            err,
            TutorError::EmptyQuestionPool {
                concept: "a".into(),
                tier: Some(DifficultyTier::Hard)
            }
        );
        assert_eq!(
            s.select_at_tier(&bank, "a", DifficultyTier::Easy, 0.5, None)
                .unwrap()
                .id,
            1
        );
    }

    #[test]
    fn record_response_updates_everything() {
        let mut bank = bank();
        let mut s = session();
        let outcome = s.record_response(&mut bank, 2, true, 50).unwrap();
        assert_eq!(outcome.pace, PaceNote::Slow);
        assert_eq!(outcome.record.concept_id, "a");
        assert_eq!(outcome.record.tier, DifficultyTier::Medium);
        assert_eq!(outcome.next_action, NextAction::Continue);
        assert_eq!(bank.get(2).unwrap().attempts, 1);

        assert_eq!(s.record_response(&mut bank, 1, false, 10).unwrap().pace, PaceNote::Fast);
        assert_eq!(s.record_response(&mut bank, 3, true, 30).unwrap().pace, PaceNote::OnPace);
    }

    #[test]
    fn unknown_question_mutates_nothing() {
        let mut bank = bank();
        let mut s = session();
        assert_eq!(
            s.record_response(&mut bank, 42, true, 10).unwrap_err(),
            TutorError::UnknownQuestion(42)
        );
        assert!(s.responses().is_empty());
    }

    #[test]
    fn three_correct_answers_escalate_tier() {
        let mut bank = bank();
        let mut s = session();
        s.record_response(&mut bank, 1, true, 30).unwrap();
        s.record_response(&mut bank, 2, true, 30).unwrap();
        let outcome = s.record_response(&mut bank, 3, true, 30).unwrap();
        assert_eq!(outcome.next_tier, DifficultyTier::Hard);
        // last-3 accuracy 1.0 is outside the convergence band
        assert_eq!(outcome.next_action, NextAction::Complete);
    }

    #[test]
    fn continuation_policy() {
        let mut bank = bank();
        let mut s = session();
        for i in 0..9 {
            s.record_response(&mut bank, 1, i % 2 == 0, 30).unwrap();
        }
        // 9 answers, last five alternate around 0.6
        assert!(s.should_continue());
        s.record_response(&mut bank, 1, true, 30).unwrap();
        assert!(!s.should_continue());
    }

    #[test]
    fn statistics_and_misconceptions() {
        let mut bank = bank();
        let mut s = session();
        s.record_response(&mut bank, 1, true, 20).unwrap();
        s.record_response(&mut bank, 3, false, 40).unwrap();
        s.record_response(&mut bank, 2, false, 30).unwrap();

        let stats = s.statistics();
        assert_eq!(stats.total_questions, 3);
        assert_eq!(stats.correct_answers, 1);
        assert_eq!(stats.current_streak, 0);
        assert!((stats.avg_time_secs - 30.0).abs() < 1e-12);
        assert_eq!(stats.concept_performance["a"].total, 3);
        assert_eq!(stats.tier_distribution[&DifficultyTier::Hard], 1);
        assert_eq!(s.misconceptions()["a"], vec![3, 2]);

        let old_id = s.id();
        s.start_new();
        assert_ne!(s.id(), old_id);
        assert!(s.responses().is_empty());
        assert_eq!(s.statistics(), QuizStatistics::default());
    }

    #[test]
    fn streak_counts_trailing_correct_answers() {
        let mut bank = bank();
        let mut s = session();
        for (id, correct) in [(1, true), (2, false), (1, true), (3, true)] {
            s.record_response(&mut bank, id, correct, 30).unwrap();
        }
        assert_eq!(s.statistics().current_streak, 2);
    }
}
