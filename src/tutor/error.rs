use crate::tutor::types::DifficultyTier;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TutorError {
    #[error("unknown concept: {0}")]
    UnknownConcept(String),
    #[error("no questions available for concept {concept} (tier: {})", tier_label(.tier))]
    EmptyQuestionPool {
        concept: String,
        tier: Option<DifficultyTier>,
    },
    #[error("unrecognized learning preference: {0}")]
    InvalidPreferenceMode(String),
    #[error("unknown question: {0}")]
    UnknownQuestion(u32),
    #[error("unknown student: {0}")]
    UnknownStudent(String),
    #[error("duplicate concept: {0}")]
    DuplicateConcept(String),
    #[error("duplicate question: {0}")]
    DuplicateQuestion(u32),
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

fn tier_label(tier: &Option<DifficultyTier>) -> &'static str {
    tier.map(|t| t.as_str()).unwrap_or("any")
}

pub type TutorResult<T> = Result<T, TutorError>;

pub(crate) fn ensure_unit(name: &'static str, value: f64) -> TutorResult<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(TutorError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_message_names_tier() {
        let err = TutorError::EmptyQuestionPool {
            concept: "algebra".into(),
            tier: Some(DifficultyTier::Hard),
        };
        assert_eq!(
            err.to_string(),
            "no questions available for concept algebra (tier: hard)"
        );

        let err = TutorError::EmptyQuestionPool {
            concept: "algebra".into(),
            tier: None,
        };
        assert!(err.to_string().ends_with("(tier: any)"));
    }

    #[test]
    fn ensure_unit_rejects_out_of_range() {
        assert!(ensure_unit("p_learn", 0.1).is_ok());
        assert!(ensure_unit("p_learn", 1.2).is_err());
        assert!(ensure_unit("p_learn", f64::NAN).is_err());
    }
}
