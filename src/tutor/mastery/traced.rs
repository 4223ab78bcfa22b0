//! Simplified knowledge tracing.
//!
//! Each concept carries a mastery probability that moves only on
//! interactions with that concept:
//!
//! - correct:   m' = m + (1 - m) * p_learn
//! - incorrect: m' = max(0, m - m * p_forget)
//!
//! The next state depends on the current state and the current outcome
//! only. Every concept starts at the same prior.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::tutor::catalog::ConceptCatalog;
use crate::tutor::config::TracingParams;
use crate::tutor::error::{TutorError, TutorResult};
use crate::tutor::types::{Interaction, KnowledgeVector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStep {
    pub timestamp: DateTime<Utc>,
    pub concept_id: String,
    pub correct: bool,
    pub mastery_before: f64,
    pub mastery_after: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeTrace {
    pub steps: Vec<TraceStep>,
    pub final_state: KnowledgeVector,
}

#[derive(Debug, Clone)]
pub struct KnowledgeStateTracer {
    catalog: Arc<ConceptCatalog>,
    params: TracingParams,
}

impl KnowledgeStateTracer {
    pub fn new(catalog: Arc<ConceptCatalog>, params: TracingParams) -> TutorResult<Self> {
        params.validate()?;
        Ok(Self { catalog, params })
    }

    pub fn with_defaults(catalog: Arc<ConceptCatalog>) -> Self {
        Self {
            catalog,
            params: TracingParams::default(),
        }
    }

    pub fn params(&self) -> &TracingParams {
        &self.params
    }

    pub fn catalog(&self) -> &ConceptCatalog {
        &self.catalog
    }

    pub fn initial_state(&self) -> KnowledgeVector {
        KnowledgeVector::from_pairs(self.catalog.ids().map(|id| (id, self.params.prior)))
    }

    pub fn learn(&self, mastery: f64) -> f64 {
        (mastery + (1.0 - mastery) * self.params.p_learn).min(1.0)
    }

    pub fn forget(&self, mastery: f64) -> f64 {
        (mastery - mastery * self.params.p_forget).max(0.0)
    }

    pub fn update(&self, mastery: f64, correct: bool) -> f64 {
        if correct {
            self.learn(mastery)
        } else {
            self.forget(mastery)
        }
    }

    /// State after one interaction. The input state is left untouched.
    pub fn next_state(
        &self,
        state: &KnowledgeVector,
        concept: &str,
        correct: bool,
    ) -> TutorResult<KnowledgeVector> {
        let current = self.current(state, concept)?;
        let mut next = state.clone();
        next.set(concept, self.update(current, correct));
        Ok(next)
    }

    /// Replays one student's interactions in timestamp order.
    pub fn trace(&self, events: &[Interaction]) -> TutorResult<KnowledgeTrace> {
        if let Some(unknown) = events.iter().find(|e| !self.catalog.contains(&e.concept_id)) {
            return Err(TutorError::UnknownConcept(unknown.concept_id.clone()));
        }

        let mut ordered: Vec<&Interaction> = events.iter().collect();
        ordered.sort_by_key(|e| e.timestamp);

        let mut state = self.initial_state();
        let mut steps = Vec::with_capacity(ordered.len());

        for event in ordered {
            let before = state.mastery_or(&event.concept_id, self.params.prior);
            let after = self.update(before, event.correct);
            state.set(event.concept_id.as_str(), after);
            steps.push(TraceStep {
                timestamp: event.timestamp,
                concept_id: event.concept_id.clone(),
                correct: event.correct,
                mastery_before: before,
                mastery_after: after,
            });
        }

        tracing::debug!(steps = steps.len(), "knowledge trace replayed");

        Ok(KnowledgeTrace {
            steps,
            final_state: state,
        })
    }

    /// Traces every student in a mixed log independently.
    pub fn trace_all(&self, log: &[Interaction]) -> TutorResult<BTreeMap<String, KnowledgeTrace>> {
        let mut by_student: BTreeMap<String, Vec<Interaction>> = BTreeMap::new();
        for event in log {
            by_student
                .entry(event.student_id.clone())
                .or_default()
                .push(event.clone());
        }

        by_student
            .into_par_iter()
            .map(|(student_id, events)| self.trace(&events).map(|trace| (student_id, trace)))
            .collect()
    }

    /// P(correct) as a mixture of "knows" and "guesses".
    pub fn predict_performance(&self, state: &KnowledgeVector, concept: &str) -> TutorResult<f64> {
        let mastery = self.current(state, concept)?;
        Ok(self.params.p_correct_known * mastery + self.params.p_correct_guess * (1.0 - mastery))
    }

    /// Number of consecutive correct answers needed to reach `threshold`,
    /// bounded by the configured step cap.
    pub fn estimate_steps_to_mastery(
        &self,
        state: &KnowledgeVector,
        concept: &str,
        threshold: f64,
    ) -> TutorResult<u32> {
        let mut mastery = self.current(state, concept)?;
        if mastery >= threshold {
            return Ok(0);
        }

        let mut steps = 0;
        while mastery < threshold && steps < self.params.max_steps {
            mastery = self.learn(mastery);
            steps += 1;
        }
        Ok(steps)
    }

    /// Mastery per concept, halved where the mean prerequisite mastery is
    /// below 0.6.
    pub fn concept_readiness(&self, state: &KnowledgeVector) -> KnowledgeVector {
        let prior = self.params.prior;
        let mut readiness = KnowledgeVector::new();
        for concept in self.catalog.iter() {
            let mut ready = state.mastery_or(&concept.id, prior);
            if !concept.prerequisites.is_empty() {
                let mean = concept
                    .prerequisites
                    .iter()
                    .map(|p| state.mastery_or(p, prior))
                    .sum::<f64>()
                    / concept.prerequisites.len() as f64;
                if mean < 0.6 {
                    ready *= 0.5;
                }
            }
            readiness.set(concept.id.as_str(), ready);
        }
        readiness
    }

    fn current(&self, state: &KnowledgeVector, concept: &str) -> TutorResult<f64> {
        self.catalog.require(concept)?;
        Ok(state.mastery_or(concept, self.params.prior))
    }
}
