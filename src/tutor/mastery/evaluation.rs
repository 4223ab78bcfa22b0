//! Offline measures over interaction logs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tutor::error::{TutorError, TutorResult};
use crate::tutor::mastery::traced::KnowledgeStateTracer;
use crate::tutor::path::PathNode;
use crate::tutor::quiz::ResponseRecord;
use crate::tutor::types::{clamp_unit, Interaction, KnowledgeVector};

const DIFFICULTY_ERROR_WEIGHT: f64 = 0.6;
const DIFFICULTY_ATTEMPT_WEIGHT: f64 = 0.4;
const DIFFICULTY_ATTEMPT_SCALE: f64 = 5.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionReport {
    pub predictions: usize,
    pub correct_predictions: usize,
    pub accuracy: f64,
}

/// How well the tracer predicts the outcome `lookahead` events ahead.
///
/// For each position `i`, the state built from events `0..i` predicts event
/// `i + lookahead` (correct when P > 0.5); event `i` is then folded in.
/// Fewer than `lookahead + 1` events yields zero predictions.
pub fn prediction_accuracy(
    tracer: &KnowledgeStateTracer,
    events: &[Interaction],
    lookahead: usize,
) -> TutorResult<PredictionReport> {
    if let Some(unknown) = events.iter().find(|e| !tracer.catalog().contains(&e.concept_id)) {
        return Err(TutorError::UnknownConcept(unknown.concept_id.clone()));
    }

    let mut ordered: Vec<&Interaction> = events.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut report = PredictionReport::default();
    if ordered.len() < lookahead + 1 {
        return Ok(report);
    }

    let mut state = tracer.initial_state();
    for i in 0..ordered.len() - lookahead {
        let target = ordered[i + lookahead];
        let predicted = tracer.predict_performance(&state, &target.concept_id)? > 0.5;
        if predicted == target.correct {
            report.correct_predictions += 1;
        }
        report.predictions += 1;

        let current = ordered[i];
        state = tracer.next_state(&state, &current.concept_id, current.correct)?;
    }

    report.accuracy = report.correct_predictions as f64 / report.predictions as f64;
    Ok(report)
}

/// Data-driven difficulty of a concept across all students in `log`.
///
/// Blends the error rate with how many misses students needed before a
/// first success (all attempts for students who never succeeded).
pub fn concept_difficulty(log: &[Interaction], concept: &str) -> f64 {
    let mut per_student: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    let mut total = 0u32;
    let mut errors = 0u32;

    for event in log.iter().filter(|e| e.concept_id == concept) {
        let entry = per_student.entry(event.student_id.as_str()).or_default();
        entry.0 += 1;
        total += 1;
        if event.correct {
            entry.1 += 1;
        } else {
            errors += 1;
        }
    }

    if total == 0 {
        return 0.5;
    }

    let error_rate = f64::from(errors) / f64::from(total);
    let attempts_to_success = per_student
        .values()
        .map(|&(attempts, correct)| {
            if correct > 0 {
                f64::from(attempts - correct)
            } else {
                f64::from(attempts)
            }
        })
        .sum::<f64>()
        / per_student.len() as f64;
    let attempt_ratio = (attempts_to_success / DIFFICULTY_ATTEMPT_SCALE).min(1.0);

    clamp_unit(DIFFICULTY_ERROR_WEIGHT * error_rate + DIFFICULTY_ATTEMPT_WEIGHT * attempt_ratio)
}

/// Share of incorrect answers for a concept, `None` when the log has none.
pub fn concept_error_rate(log: &[Interaction], concept: &str) -> Option<f64> {
    let (total, errors) = log
        .iter()
        .filter(|e| e.concept_id == concept)
        .fold((0u32, 0u32), |(total, errors), e| {
            (total + 1, errors + u32::from(!e.correct))
        });
    (total > 0).then(|| f64::from(errors) / f64::from(total))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptProgress {
    pub attempts: usize,
    pub accuracy: f64,
    pub first_correct: bool,
    pub final_correct: bool,
    /// Final outcome minus first outcome: -1, 0 or 1.
    pub improvement: f64,
}

/// Per-concept progression for one student's events, in timestamp order.
pub fn concept_progress(events: &[Interaction]) -> BTreeMap<String, ConceptProgress> {
    let mut ordered: Vec<&Interaction> = events.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut outcomes: BTreeMap<&str, Vec<bool>> = BTreeMap::new();
    for event in ordered {
        outcomes
            .entry(event.concept_id.as_str())
            .or_default()
            .push(event.correct);
    }

    outcomes
        .into_iter()
        .filter_map(|(concept, results)| {
            let first = *results.first()?;
            let last = *results.last()?;
            let correct = results.iter().filter(|&&c| c).count();
            let progress = ConceptProgress {
                attempts: results.len(),
                accuracy: correct as f64 / results.len() as f64,
                first_correct: first,
                final_correct: last,
                improvement: f64::from(u8::from(last)) - f64::from(u8::from(first)),
            };
            Some((concept.to_string(), progress))
        })
        .collect()
}

/// Mean mastery of the concepts on each path, averaged over students with a
/// non-empty path. Concepts missing from the knowledge vector count as 0.
pub fn path_effectiveness<'a, I>(paths: I) -> f64
where
    I: IntoIterator<Item = (&'a [PathNode], &'a KnowledgeVector)>,
{
    let scores: Vec<f64> = paths
        .into_iter()
        .filter(|(path, _)| !path.is_empty())
        .map(|(path, knowledge)| {
            let masteries: Vec<f64> = path
                .iter()
                .map(|node| knowledge.mastery_or(&node.concept_id, 0.0))
                .collect();
            mean(&masteries)
        })
        .collect();
    mean(&scores)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationReport {
    pub transitions: usize,
    pub correct_then_harder_ratio: f64,
    pub incorrect_then_easier_ratio: f64,
    /// Mean of the two ratios.
    pub adaptation_quality: f64,
}

/// How often consecutive quiz responses moved the tier the right way: up
/// after a correct answer, down after an incorrect one.
pub fn difficulty_adaptation(responses: &[ResponseRecord]) -> AdaptationReport {
    let transitions = responses.len().saturating_sub(1);
    if transitions == 0 {
        return AdaptationReport::default();
    }

    let mut harder = 0usize;
    let mut easier = 0usize;
    for pair in responses.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        if current.correct && next.tier > current.tier {
            harder += 1;
        } else if !current.correct && next.tier < current.tier {
            easier += 1;
        }
    }

    let correct_then_harder_ratio = harder as f64 / transitions as f64;
    let incorrect_then_easier_ratio = easier as f64 / transitions as f64;
    AdaptationReport {
        transitions,
        correct_then_harder_ratio,
        incorrect_then_easier_ratio,
        adaptation_quality: (correct_then_harder_ratio + incorrect_then_easier_ratio) / 2.0,
    }
}

/// Hake's normalized gain, clipped to [0, 1].
pub fn normalized_gain(pre: &[f64], post: &[f64]) -> f64 {
    let pre_mean = mean(pre);
    let post_mean = mean(post);
    let max_gain = 1.0 - pre_mean;
    if max_gain.abs() < f64::EPSILON {
        return 0.0;
    }
    clamp_unit((post_mean - pre_mean) / max_gain)
}

/// Slope of accuracy across consecutive non-overlapping windows.
/// A trailing partial window is ignored.
pub fn improvement_rate(outcomes: &[bool], window: usize) -> f64 {
    if outcomes.len() < 2 || window == 0 {
        return 0.0;
    }

    let windows: Vec<f64> = outcomes
        .chunks_exact(window)
        .map(|chunk| chunk.iter().filter(|&&c| c).count() as f64 / window as f64)
        .collect();

    slope(&windows)
}

/// Number of answers until the running accuracy first reaches `threshold`,
/// or the full length when it never does.
pub fn questions_to_mastery(outcomes: &[bool], threshold: f64) -> usize {
    let mut correct = 0usize;
    for (i, &outcome) in outcomes.iter().enumerate() {
        if outcome {
            correct += 1;
        }
        let count = i + 1;
        if correct as f64 / count as f64 >= threshold {
            return count;
        }
    }
    outcomes.len()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_xx: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();

    let denominator = n * sum_xx - sum_x.powi(2);
    if denominator.abs() < 1e-10 {
        return 0.0;
    }

    (n * sum_xy - sum_x * sum_y) / denominator
}
