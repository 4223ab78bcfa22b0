use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tutor::types::DifficultyTier;

/// Per-student, per-concept counters. Only the streak ever goes down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMetrics {
    pub attempts: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub total_time_secs: u64,
    pub avg_difficulty_faced: f64,
    pub streak: u32,
    pub last_attempt: Option<DateTime<Utc>>,
}

impl ConceptMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        correct: bool,
        time_spent_secs: u32,
        tier: DifficultyTier,
        timestamp: DateTime<Utc>,
    ) {
        self.attempts += 1;
        if correct {
            self.correct += 1;
            self.streak += 1;
        } else {
            self.incorrect += 1;
            self.streak = 0;
        }
        self.total_time_secs += u64::from(time_spent_secs);
        self.last_attempt = Some(timestamp);

        let n = f64::from(self.attempts);
        self.avg_difficulty_faced = (self.avg_difficulty_faced * (n - 1.0) + tier.score()) / n;
    }

    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(self.attempts)
    }

    pub fn avg_time_secs(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.total_time_secs as f64 / f64::from(self.attempts)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallMetrics {
    pub total_questions: u32,
    pub total_correct: u32,
    pub total_time_secs: u64,
    pub average_accuracy: f64,
}

impl OverallMetrics {
    pub fn record(&mut self, correct: bool, time_spent_secs: u32) {
        self.total_questions += 1;
        if correct {
            self.total_correct += 1;
        }
        self.total_time_secs += u64::from(time_spent_secs);
        self.average_accuracy =
            f64::from(self.total_correct) / f64::from(self.total_questions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_resets_on_incorrect() {
        let now = Utc::now();
        let mut m = ConceptMetrics::new();
        m.record(true, 30, DifficultyTier::Easy, now);
        m.record(true, 30, DifficultyTier::Easy, now);
        assert_eq!(m.streak, 2);
        m.record(false, 30, DifficultyTier::Easy, now);
        assert_eq!(m.streak, 0);
        assert_eq!(m.attempts, 3);
        assert_eq!(m.correct, 2);
        assert_eq!(m.incorrect, 1);
    }

    #[test]
    fn running_average_difficulty() {
        let now = Utc::now();
        let mut m = ConceptMetrics::new();
        m.record(true, 10, DifficultyTier::Easy, now);
        m.record(true, 20, DifficultyTier::Hard, now);
        assert!((m.avg_difficulty_faced - 2.0).abs() < 1e-12);
        assert!((m.avg_time_secs() - 15.0).abs() < 1e-12);
        assert_eq!(m.last_attempt, Some(now));
    }

    #[test]
    fn overall_accuracy_tracks_totals() {
        let mut o = OverallMetrics::default();
        o.record(true, 10);
        o.record(false, 20);
        assert_eq!(o.total_questions, 2);
        assert_eq!(o.total_time_secs, 30);
        assert!((o.average_accuracy - 0.5).abs() < 1e-12);
    }
}
