use std::sync::Arc;

use crate::tutor::catalog::ConceptCatalog;
use crate::tutor::config::MasterySource;
use crate::tutor::error::TutorResult;
use crate::tutor::mastery::empirical::MasteryEstimator;
use crate::tutor::mastery::traced::KnowledgeStateTracer;
use crate::tutor::profile::LearnerProfile;
use crate::tutor::types::KnowledgeVector;

/// A way of turning a learner profile into per-concept mastery.
pub trait MasteryModel: Send + Sync {
    fn source(&self) -> MasterySource;

    /// Mastery for every catalog concept, in catalog order.
    fn knowledge(&self, profile: &LearnerProfile) -> TutorResult<KnowledgeVector>;
}

/// Counter-based mastery; unattempted concepts sit at 0.0.
#[derive(Debug, Clone)]
pub struct EmpiricalMastery {
    catalog: Arc<ConceptCatalog>,
    estimator: MasteryEstimator,
}

impl EmpiricalMastery {
    pub fn new(catalog: Arc<ConceptCatalog>, estimator: MasteryEstimator) -> Self {
        Self { catalog, estimator }
    }

    pub fn estimator(&self) -> &MasteryEstimator {
        &self.estimator
    }
}

impl MasteryModel for EmpiricalMastery {
    fn source(&self) -> MasterySource {
        MasterySource::Empirical
    }

    fn knowledge(&self, profile: &LearnerProfile) -> TutorResult<KnowledgeVector> {
        Ok(KnowledgeVector::from_pairs(self.catalog.ids().map(|id| {
            let mastery = profile
                .metrics_for(id)
                .map(|m| self.estimator.mastery(m))
                .unwrap_or(0.0);
            (id, mastery)
        })))
    }
}

/// Mastery replayed from the profile's interaction history; unattempted
/// concepts sit at the tracer prior.
#[derive(Debug, Clone)]
pub struct TracedMastery {
    tracer: KnowledgeStateTracer,
}

impl TracedMastery {
    pub fn new(tracer: KnowledgeStateTracer) -> Self {
        Self { tracer }
    }

    pub fn tracer(&self) -> &KnowledgeStateTracer {
        &self.tracer
    }
}

impl MasteryModel for TracedMastery {
    fn source(&self) -> MasterySource {
        MasterySource::Traced
    }

    fn knowledge(&self, profile: &LearnerProfile) -> TutorResult<KnowledgeVector> {
        Ok(self.tracer.trace(profile.history())?.final_state)
    }
}
