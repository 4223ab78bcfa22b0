use serde::{Deserialize, Serialize};

use crate::tutor::error::{TutorError, TutorResult};

/// How a learner wants candidate concepts ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum PreferenceMode {
    #[default]
    Balanced,
    Progressive,
    Review,
    /// Plain mastery gap; used for unrecognized preferences.
    Fallback,
}

impl PreferenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Progressive => "progressive",
            Self::Review => "review",
            Self::Fallback => "fallback",
        }
    }

    /// Lenient parse. Unrecognized input ranks by mastery gap alone.
    pub fn parse(s: &str) -> Self {
        match Self::parse_strict(s) {
            Ok(mode) => mode,
            Err(_) => {
                tracing::warn!(preference = %s, "unrecognized learning preference, ranking by mastery gap");
                Self::Fallback
            }
        }
    }

    pub fn parse_strict(s: &str) -> TutorResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "balanced" => Ok(Self::Balanced),
            "progressive" => Ok(Self::Progressive),
            "review" => Ok(Self::Review),
            "fallback" => Ok(Self::Fallback),
            _ => Err(TutorError::InvalidPreferenceMode(s.to_string())),
        }
    }

    /// Priority of a candidate; higher is picked first.
    pub fn priority(&self, mastery: f64, difficulty: f64, weak: bool) -> f64 {
        let gap = 1.0 - mastery;
        match self {
            Self::Balanced => {
                let base = 0.5 * gap + 0.3 * difficulty;
                if weak {
                    base * 1.3
                } else {
                    base
                }
            }
            Self::Progressive => 0.4 * gap + 0.6 * difficulty,
            Self::Review => {
                if weak {
                    gap * 2.0
                } else {
                    gap
                }
            }
            Self::Fallback => gap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_boosts_weak_concepts() {
        let mode = PreferenceMode::Balanced;
        assert!((mode.priority(0.1, 0.5, true) - 0.78).abs() < 1e-12);
        assert!((mode.priority(0.8, 0.3, false) - 0.19).abs() < 1e-12);
    }

    #[test]
    fn other_modes() {
        assert!((PreferenceMode::Progressive.priority(0.5, 0.5, true) - 0.5).abs() < 1e-12);
        assert!((PreferenceMode::Review.priority(0.5, 0.9, true) - 1.0).abs() < 1e-12);
        assert!((PreferenceMode::Review.priority(0.5, 0.9, false) - 0.5).abs() < 1e-12);
        assert!((PreferenceMode::Fallback.priority(0.25, 0.9, true) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn parse_variants() {
        assert_eq!(PreferenceMode::parse("Review"), PreferenceMode::Review);
        assert_eq!(PreferenceMode::parse("speedrun"), PreferenceMode::Fallback);
        assert_eq!(
            PreferenceMode::parse_strict("speedrun"),
            Err(TutorError::InvalidPreferenceMode("speedrun".into()))
        );
    }
}
