//! Batch replay of a recorded dataset through the engine.
//!
//! Loads concepts, questions and an interaction log from one JSON document,
//! ingests the log, and reports profiles, tracer accuracy, data-driven
//! concept difficulty, sample learning paths and bank statistics.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::feedback::{FeedbackGenerator, ProgressContext};
use crate::tutor::catalog::ConceptCatalog;
use crate::tutor::config::TutorConfig;
use crate::tutor::engine::TutorEngine;
use crate::tutor::error::TutorError;
use crate::tutor::mastery::{
    concept_difficulty, concept_error_rate, improvement_rate, PredictionReport,
};
use crate::tutor::path::{PathNode, PathRequest};
use crate::tutor::profile::ProfileSummary;
use crate::tutor::quiz::{BankStatistics, QuestionSpec};
use crate::tutor::types::{Concept, Interaction};

const MIN_DATA_DIFFICULTY: f64 = 0.2;
const MAX_DATA_DIFFICULTY: f64 = 0.8;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Tutor(#[from] TutorError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub questions: Vec<QuestionSpec>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Students (in id order) that get a learning path in the report.
    pub sample_students: usize,
    pub lookahead: usize,
    pub improvement_window: usize,
    /// Replace catalog difficulties of observed concepts with their error
    /// rate in the log, clamped to [0.2, 0.8].
    pub data_driven_difficulty: bool,
    pub path_request: PathRequest,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            sample_students: 3,
            lookahead: 1,
            improvement_window: 5,
            data_driven_difficulty: true,
            path_request: PathRequest::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub path: Vec<PathNode>,
    pub duration_minutes: u32,
    pub improvement_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub students: usize,
    pub interactions: usize,
    pub profiles: Vec<ProfileSummary>,
    pub prediction: PredictionReport,
    /// Mean mastery over each sampled student's path concepts.
    pub path_effectiveness: f64,
    pub concept_difficulty: BTreeMap<String, f64>,
    pub samples: BTreeMap<String, StudentReport>,
    pub bank: BankStatistics,
}

pub fn run(
    dataset: Dataset,
    config: TutorConfig,
    options: &PipelineOptions,
    feedback: Option<&dyn FeedbackGenerator>,
) -> Result<PipelineReport, PipelineError> {
    let Dataset {
        concepts,
        questions,
        interactions,
    } = dataset;

    // Validate ids against the declared catalog before recalibrating.
    let declared = ConceptCatalog::new(concepts.clone())?;
    for event in &interactions {
        declared.require(&event.concept_id)?;
    }

    let difficulty: BTreeMap<String, f64> = declared
        .ids()
        .map(|id| (id.to_string(), concept_difficulty(&interactions, id)))
        .collect();

    let concepts = if options.data_driven_difficulty {
        concepts
            .into_iter()
            .map(|c| match concept_error_rate(&interactions, &c.id) {
                Some(rate) => Concept {
                    difficulty: rate.clamp(MIN_DATA_DIFFICULTY, MAX_DATA_DIFFICULTY),
                    ..c
                },
                None => c,
            })
            .collect()
    } else {
        concepts
    };

    let mut engine = TutorEngine::new(ConceptCatalog::new(concepts)?, questions, config)?;
    let interaction_count = engine.ingest_all(interactions)?;

    let students: Vec<String> = engine.registry().students().map(str::to_string).collect();

    let mut prediction = PredictionReport::default();
    for student in &students {
        let report = engine.prediction_accuracy(student, options.lookahead)?;
        prediction.predictions += report.predictions;
        prediction.correct_predictions += report.correct_predictions;
    }
    if prediction.predictions > 0 {
        prediction.accuracy = prediction.correct_predictions as f64 / prediction.predictions as f64;
    }

    let profiles = engine.summaries()?;

    let mut samples = BTreeMap::new();
    for student in students.iter().take(options.sample_students) {
        let path = engine.create_path(student, &options.path_request)?;
        let profile = engine.profile(student)?;

        let mut history: Vec<&Interaction> = profile.history().iter().collect();
        history.sort_by_key(|e| e.timestamp);
        let outcomes: Vec<bool> = history.iter().map(|e| e.correct).collect();
        let streak = outcomes.iter().rev().take_while(|&&c| c).count() as u32;

        let message = match feedback {
            Some(generator) => {
                let knowledge = engine.knowledge(student, None)?;
                let progress = ProgressContext {
                    mastery: knowledge.mean(),
                    total_questions: profile.overall().total_questions,
                    accuracy: profile.overall().average_accuracy,
                    streak,
                };
                generator.motivational_message(&progress).ok()
            }
            None => None,
        };

        samples.insert(
            student.clone(),
            StudentReport {
                duration_minutes: engine.path_duration(student)?,
                improvement_rate: improvement_rate(&outcomes, options.improvement_window),
                path,
                message,
            },
        );
    }

    let path_effectiveness = engine.path_effectiveness()?;

    tracing::info!(
        students = students.len(),
        interactions = interaction_count,
        prediction_accuracy = prediction.accuracy,
        "pipeline finished"
    );

    Ok(PipelineReport {
        students: students.len(),
        interactions: interaction_count,
        profiles,
        prediction,
        path_effectiveness,
        concept_difficulty: difficulty,
        samples,
        bank: engine.bank_statistics(),
    })
}
