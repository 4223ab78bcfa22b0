use serde::{Deserialize, Serialize};

use crate::tutor::error::{ensure_unit, TutorResult};
use crate::tutor::types::DifficultyTier;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteryParams {
    pub streak_step: f64,
    pub streak_cap: f64,
    pub effort_saturation_attempts: f64,
    pub effort_weight: f64,
    pub weak_threshold: f64,
    pub strong_threshold: f64,
}

impl Default for MasteryParams {
    fn default() -> Self {
        Self {
            streak_step: 0.05,
            streak_cap: 0.1,
            effort_saturation_attempts: 10.0,
            effort_weight: 0.1,
            weak_threshold: 0.6,
            strong_threshold: 0.75,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingParams {
    pub p_learn: f64,
    pub p_forget: f64,
    pub prior: f64,
    pub p_correct_known: f64,
    pub p_correct_guess: f64,
    pub mastery_threshold: f64,
    pub max_steps: u32,
}

impl Default for TracingParams {
    fn default() -> Self {
        Self {
            p_learn: 0.10,
            p_forget: 0.05,
            prior: 0.3,
            p_correct_known: 0.9,
            p_correct_guess: 0.1,
            mastery_threshold: 0.8,
            max_steps: 100,
        }
    }
}

impl TracingParams {
    pub fn validate(&self) -> TutorResult<()> {
        ensure_unit("p_learn", self.p_learn)?;
        ensure_unit("p_forget", self.p_forget)?;
        ensure_unit("prior", self.prior)?;
        ensure_unit("p_correct_known", self.p_correct_known)?;
        ensure_unit("p_correct_guess", self.p_correct_guess)?;
        ensure_unit("mastery_threshold", self.mastery_threshold)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathParams {
    pub mastered_threshold: f64,
    pub prerequisite_threshold: f64,
    pub max_difficulty: f64,
    pub num_concepts: usize,
    pub advanced_resource_difficulty: f64,
}

impl Default for PathParams {
    fn default() -> Self {
        Self {
            mastered_threshold: 0.85,
            prerequisite_threshold: 0.6,
            max_difficulty: 0.8,
            num_concepts: 5,
            advanced_resource_difficulty: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizParams {
    pub pass_threshold: f64,
    pub tier_window: usize,
    pub escalate_passes: usize,
    pub min_responses: usize,
    pub accuracy_window: usize,
    pub converge_low: f64,
    pub converge_high: f64,
    pub max_questions: usize,
    pub initial_tier: DifficultyTier,
    pub slow_factor: f64,
    pub fast_factor: f64,
}

impl Default for QuizParams {
    fn default() -> Self {
        Self {
            pass_threshold: 0.65,
            tier_window: 3,
            escalate_passes: 2,
            min_responses: 3,
            accuracy_window: 5,
            converge_low: 0.3,
            converge_high: 0.8,
            max_questions: 10,
            initial_tier: DifficultyTier::Medium,
            slow_factor: 1.5,
            fast_factor: 0.5,
        }
    }
}

/// Which mastery derivation feeds path planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum MasterySource {
    #[default]
    Empirical,
    Traced,
}

impl MasterySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empirical => "empirical",
            Self::Traced => "traced",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "traced" | "dkt" => Self::Traced,
            _ => Self::Empirical,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub mastery: MasteryParams,
    pub tracing: TracingParams,
    pub path: PathParams,
    pub quiz: QuizParams,
    pub mastery_source: MasterySource,
}

impl TutorConfig {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Environment values win over whatever is already set.
    pub fn with_env_overrides(self) -> Self {
        let mut config = self;

        if let Ok(val) = std::env::var("TUTOR_P_LEARN") {
            config.tracing.p_learn = val.parse().unwrap_or(config.tracing.p_learn);
        }
        if let Ok(val) = std::env::var("TUTOR_P_FORGET") {
            config.tracing.p_forget = val.parse().unwrap_or(config.tracing.p_forget);
        }
        if let Ok(val) = std::env::var("TUTOR_PRIOR") {
            config.tracing.prior = val.parse().unwrap_or(config.tracing.prior);
        }
        if let Ok(val) = std::env::var("TUTOR_MAX_QUESTIONS") {
            config.quiz.max_questions = val.parse().unwrap_or(config.quiz.max_questions);
        }
        if let Ok(val) = std::env::var("TUTOR_MASTERY_SOURCE") {
            config.mastery_source = MasterySource::parse(&val);
        }

        config
    }

    pub fn validate(&self) -> TutorResult<()> {
        self.tracing.validate()?;
        ensure_unit("max_difficulty", self.path.max_difficulty)?;
        ensure_unit("pass_threshold", self.quiz.pass_threshold)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = TutorConfig::default();
        assert_eq!(config.tracing.p_learn, 0.10);
        assert_eq!(config.tracing.p_forget, 0.05);
        assert_eq!(config.tracing.prior, 0.3);
        assert_eq!(config.path.mastered_threshold, 0.85);
        assert_eq!(config.quiz.max_questions, 10);
        assert_eq!(config.mastery_source, MasterySource::Empirical);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_tracing_param_is_rejected() {
        let mut config = TutorConfig::default();
        config.tracing.p_forget = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn mastery_source_parse() {
        assert_eq!(MasterySource::parse("Traced"), MasterySource::Traced);
        assert_eq!(MasterySource::parse("whatever"), MasterySource::Empirical);
    }
}
