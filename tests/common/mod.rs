#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use tutor_engine::tutor::quiz::QuestionSpec;
use tutor_engine::tutor::{Concept, ConceptCatalog, DifficultyTier, Interaction, TutorConfig, TutorEngine};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// counting -> addition -> multiplication, plus an unrelated hard topic.
pub fn arithmetic_catalog() -> ConceptCatalog {
    ConceptCatalog::new(vec![
        Concept::new("counting").with_difficulty(0.1).with_estimated_minutes(15),
        Concept::new("addition")
            .with_difficulty(0.3)
            .with_prerequisites(["counting"])
            .with_estimated_minutes(20),
        Concept::new("multiplication")
            .with_difficulty(0.5)
            .with_prerequisites(["addition"])
            .with_estimated_minutes(30),
        Concept::new("calculus").with_difficulty(0.9).with_estimated_minutes(60),
    ])
    .unwrap()
}

pub fn arithmetic_questions() -> Vec<QuestionSpec> {
    let mut specs = Vec::new();
    let mut id = 1;
    for concept in ["counting", "addition", "multiplication"] {
        for tier in DifficultyTier::ALL {
            specs.push(QuestionSpec::new(id, concept, tier).with_estimated_secs(40));
            id += 1;
        }
    }
    specs
}

pub fn engine() -> TutorEngine {
    TutorEngine::new(arithmetic_catalog(), arithmetic_questions(), TutorConfig::default()).unwrap()
}

/// Interaction `minutes` after [`base_time`].
pub fn event(student: &str, concept: &str, correct: bool, minutes: i64) -> Interaction {
    Interaction {
        student_id: student.to_string(),
        concept_id: concept.to_string(),
        correct,
        time_spent_secs: 45,
        tier: DifficultyTier::Medium,
        timestamp: base_time() + Duration::minutes(minutes),
    }
}

/// One event per outcome, one minute apart.
pub fn events(student: &str, concept: &str, outcomes: &[bool]) -> Vec<Interaction> {
    outcomes
        .iter()
        .enumerate()
        .map(|(i, &correct)| event(student, concept, correct, i as i64))
        .collect()
}
