pub mod empirical;
pub mod evaluation;
pub mod metrics;
pub mod model;
pub mod traced;

pub use empirical::MasteryEstimator;
pub use evaluation::{
    concept_difficulty, concept_error_rate, concept_progress, difficulty_adaptation,
    improvement_rate, normalized_gain, path_effectiveness, prediction_accuracy,
    questions_to_mastery, AdaptationReport, ConceptProgress, PredictionReport,
};
pub use metrics::{ConceptMetrics, OverallMetrics};
pub use model::{EmpiricalMastery, MasteryModel, TracedMastery};
pub use traced::{KnowledgeStateTracer, KnowledgeTrace, TraceStep};
