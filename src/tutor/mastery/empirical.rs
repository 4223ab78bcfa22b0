//! Closed-form mastery from attempt counters.
//!
//! mastery = accuracy + streak bonus + effort bonus, clamped to [0, 1].
//! A concept that was never attempted sits at exactly 0.0.

use crate::tutor::config::MasteryParams;
use crate::tutor::mastery::metrics::ConceptMetrics;
use crate::tutor::types::{clamp_unit, KnowledgeVector};

#[derive(Debug, Clone, Default)]
pub struct MasteryEstimator {
    params: MasteryParams,
}

impl MasteryEstimator {
    pub fn new(params: MasteryParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MasteryParams {
        &self.params
    }

    pub fn mastery(&self, metrics: &ConceptMetrics) -> f64 {
        if metrics.attempts == 0 {
            return 0.0;
        }

        let accuracy = metrics.accuracy();
        let streak_bonus =
            (f64::from(metrics.streak) * self.params.streak_step).min(self.params.streak_cap);
        let effort_bonus = (f64::from(metrics.attempts) / self.params.effort_saturation_attempts)
            .min(1.0)
            * self.params.effort_weight;

        clamp_unit(accuracy + streak_bonus + effort_bonus)
    }

    /// Concepts below the weak threshold, lowest mastery first.
    pub fn weak_concepts(&self, knowledge: &KnowledgeVector, n: usize) -> Vec<String> {
        let threshold = self.params.weak_threshold;
        let mut weak: Vec<(&str, f64)> = knowledge.iter().filter(|(_, m)| *m < threshold).collect();
        weak.sort_by(|a, b| a.1.total_cmp(&b.1));
        weak.into_iter().take(n).map(|(c, _)| c.to_string()).collect()
    }

    /// Concepts at or above the strong threshold, highest mastery first.
    pub fn strong_concepts(&self, knowledge: &KnowledgeVector, n: usize) -> Vec<String> {
        let threshold = self.params.strong_threshold;
        let mut strong: Vec<(&str, f64)> =
            knowledge.iter().filter(|(_, m)| *m >= threshold).collect();
        strong.sort_by(|a, b| b.1.total_cmp(&a.1));
        strong.into_iter().take(n).map(|(c, _)| c.to_string()).collect()
    }
}
