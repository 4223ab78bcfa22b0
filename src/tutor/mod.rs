pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod mastery;
pub mod path;
pub mod profile;
pub mod quiz;
pub mod types;

pub use catalog::ConceptCatalog;
pub use config::{MasteryParams, MasterySource, PathParams, QuizParams, TracingParams, TutorConfig};
pub use engine::TutorEngine;
pub use error::{TutorError, TutorResult};
pub use profile::{LearnerProfile, ProfileRegistry, ProfileSummary};
pub use types::{Concept, DifficultyTier, Interaction, KnowledgeVector, TaxonomyTier};
