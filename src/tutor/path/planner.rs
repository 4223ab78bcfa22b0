//! Learning path generation and adaptation.
//!
//! Generation runs in four stages: filter the catalog down to learnable
//! concepts, score them by preference, keep the top N, then order the kept
//! concepts so in-path prerequisites tend to come first.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tutor::catalog::ConceptCatalog;
use crate::tutor::config::PathParams;
use crate::tutor::error::{ensure_unit, TutorResult};
use crate::tutor::path::scoring::PreferenceMode;
use crate::tutor::types::{Concept, KnowledgeVector, TaxonomyTier};

const BASE_RESOURCES: [&str; 3] = ["Video Lecture", "Reading Material", "Practice Problems"];
const ADVANCED_RESOURCES: [&str; 2] = ["Expert Explanation", "Step-by-step Tutorial"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeStatus {
    InProgress,
    Completed,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRequest {
    pub num_concepts: usize,
    pub max_difficulty: f64,
    #[serde(default)]
    pub preference: PreferenceMode,
}

impl Default for PathRequest {
    fn default() -> Self {
        Self::from_params(&PathParams::default())
    }
}

impl PathRequest {
    pub fn from_params(params: &PathParams) -> Self {
        Self {
            num_concepts: params.num_concepts,
            max_difficulty: params.max_difficulty,
            preference: PreferenceMode::default(),
        }
    }

    pub fn with_num_concepts(mut self, num_concepts: usize) -> Self {
        self.num_concepts = num_concepts;
        self
    }

    pub fn with_max_difficulty(mut self, max_difficulty: f64) -> Self {
        self.max_difficulty = max_difficulty;
        self
    }

    pub fn with_preference(mut self, preference: PreferenceMode) -> Self {
        self.preference = preference;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathNode {
    /// 1-based.
    pub position: usize,
    pub concept_id: String,
    pub difficulty: f64,
    pub mastery: f64,
    pub priority: f64,
    pub estimated_minutes: u32,
    pub prerequisites: Vec<String>,
    pub taxonomy: TaxonomyTier,
    pub resources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
}

struct Candidate<'a> {
    concept: &'a Concept,
    mastery: f64,
    priority: f64,
}

#[derive(Debug, Clone)]
pub struct LearningPathPlanner {
    catalog: Arc<ConceptCatalog>,
    params: PathParams,
}

impl LearningPathPlanner {
    pub fn new(catalog: Arc<ConceptCatalog>, params: PathParams) -> Self {
        Self { catalog, params }
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn generate_path(
        &self,
        knowledge: &KnowledgeVector,
        weak: &[String],
        request: &PathRequest,
    ) -> TutorResult<Vec<PathNode>> {
        for concept in knowledge.concepts().chain(weak.iter().map(String::as_str)) {
            self.catalog.require(concept)?;
        }
        let max_difficulty = ensure_unit("max_difficulty", request.max_difficulty)?;

        let weak: HashSet<&str> = weak.iter().map(String::as_str).collect();

        let mut candidates: Vec<Candidate<'_>> = self
            .catalog
            .iter()
            .filter_map(|concept| {
                let mastery = knowledge.mastery_or(&concept.id, 0.0);
                if !self.is_learnable(concept, mastery, max_difficulty, knowledge) {
                    return None;
                }
                let priority = request.preference.priority(
                    mastery,
                    concept.difficulty,
                    weak.contains(concept.id.as_str()),
                );
                Some(Candidate {
                    concept,
                    mastery,
                    priority,
                })
            })
            .collect();

        let eligible = candidates.len();
        candidates.sort_by(|a, b| b.priority.total_cmp(&a.priority));
        candidates.truncate(request.num_concepts);

        let selected: HashSet<&str> = candidates.iter().map(|c| c.concept.id.as_str()).collect();
        let in_path_prerequisites = |concept: &Concept| {
            concept
                .prerequisites
                .iter()
                .filter(|p| selected.contains(p.as_str()))
                .count()
        };

        // Not a topological sort: prerequisite count, then difficulty, then
        // larger mastery gap first.
        candidates.sort_by(|a, b| {
            in_path_prerequisites(a.concept)
                .cmp(&in_path_prerequisites(b.concept))
                .then_with(|| a.concept.difficulty.total_cmp(&b.concept.difficulty))
                .then_with(|| a.mastery.total_cmp(&b.mastery))
        });

        let path: Vec<PathNode> = candidates
            .into_iter()
            .enumerate()
            .map(|(i, c)| self.node(i + 1, c))
            .collect();

        tracing::debug!(
            eligible,
            selected = path.len(),
            preference = request.preference.as_str(),
            "learning path generated"
        );

        Ok(path)
    }

    /// Refreshes mastery, taxonomy and status from the latest knowledge.
    /// Node order and identity never change.
    pub fn adapt_path(&self, path: &[PathNode], latest: &KnowledgeVector) -> Vec<PathNode> {
        path.iter()
            .map(|node| {
                let mastery = latest.mastery_or(&node.concept_id, node.mastery);
                let status = if mastery >= self.params.mastered_threshold {
                    NodeStatus::Completed
                } else {
                    NodeStatus::InProgress
                };
                PathNode {
                    mastery,
                    taxonomy: TaxonomyTier::from_mastery(mastery),
                    status: Some(status),
                    ..node.clone()
                }
            })
            .collect()
    }

    /// First node not yet mastered; concepts missing from `mastery` count as 0.
    pub fn next_concept<'a>(
        &self,
        path: &'a [PathNode],
        mastery: &KnowledgeVector,
    ) -> Option<&'a PathNode> {
        path.iter()
            .find(|node| mastery.mastery_or(&node.concept_id, 0.0) < self.params.mastered_threshold)
    }

    pub fn estimate_duration(&self, path: &[PathNode]) -> u32 {
        path.iter().map(|node| node.estimated_minutes).sum()
    }

    fn is_learnable(
        &self,
        concept: &Concept,
        mastery: f64,
        max_difficulty: f64,
        knowledge: &KnowledgeVector,
    ) -> bool {
        if mastery >= self.params.mastered_threshold {
            return false;
        }
        if concept.difficulty > max_difficulty {
            return false;
        }
        concept
            .prerequisites
            .iter()
            .all(|p| knowledge.mastery_or(p, 0.0) >= self.params.prerequisite_threshold)
    }

    fn node(&self, position: usize, candidate: Candidate<'_>) -> PathNode {
        let concept = candidate.concept;
        let mut resources: Vec<String> = BASE_RESOURCES.iter().map(|r| r.to_string()).collect();
        if concept.difficulty > self.params.advanced_resource_difficulty {
            resources.extend(ADVANCED_RESOURCES.iter().map(|r| r.to_string()));
        }

        PathNode {
            position,
            concept_id: concept.id.clone(),
            difficulty: concept.difficulty,
            mastery: candidate.mastery,
            priority: candidate.priority,
            estimated_minutes: concept.estimated_minutes,
            prerequisites: concept.prerequisites.clone(),
            taxonomy: TaxonomyTier::from_mastery(candidate.mastery),
            resources,
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tutor::error::TutorError;

    fn planner() -> LearningPathPlanner {
        let catalog = ConceptCatalog::new(vec![
            Concept::new("A").with_difficulty(0.3),
            Concept::new("B")
                .with_difficulty(0.5)
                .with_prerequisites(["A"]),
        ])
        .unwrap();
        LearningPathPlanner::new(Arc::new(catalog), PathParams::default())
    }

    #[test]
    fn prerequisite_concept_comes_first() {
        let kv = KnowledgeVector::from_pairs([("A", 0.8), ("B", 0.1)]);
        let request = PathRequest::default().with_num_concepts(2);
        let path = planner()
            .generate_path(&kv, &["B".to_string()], &request)
            .unwrap();

        let ids: Vec<_> = path.iter().map(|n| n.concept_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(path[0].position, 1);
        assert!((path[0].priority - 0.19).abs() < 1e-12);
        assert!((path[1].priority - 0.78).abs() < 1e-12);
        assert_eq!(path[1].taxonomy, TaxonomyTier::Remember);
        assert!(path.iter().all(|n| n.status.is_none()));
    }

    #[test]
    fn unmet_prerequisite_excludes_concept() {
        let kv = KnowledgeVector::from_pairs([("A", 0.5), ("B", 0.1)]);
        let path = planner()
            .generate_path(&kv, &[], &PathRequest::default())
            .unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].concept_id, "A");
    }

    #[test]
    fn unknown_concepts_are_rejected() {
        let kv = KnowledgeVector::from_pairs([("Z", 0.5)]);
        let err = planner()
            .generate_path(&kv, &[], &PathRequest::default())
            .unwrap_err();
        assert_eq!(err, TutorError::UnknownConcept("Z".into()));

        let err = planner()
            .generate_path(&KnowledgeVector::new(), &["Q".to_string()], &PathRequest::default())
            .unwrap_err();
        assert_eq!(err, TutorError::UnknownConcept("Q".into()));
    }

    #[test]
    fn advanced_resources_for_hard_concepts() {
        let catalog = ConceptCatalog::new(vec![Concept::new("H").with_difficulty(0.75)]).unwrap();
        let planner = LearningPathPlanner::new(Arc::new(catalog), PathParams::default());
        let path = planner
            .generate_path(&KnowledgeVector::new(), &[], &PathRequest::default())
            .unwrap();
        assert_eq!(path[0].resources.len(), 5);
        assert_eq!(path[0].resources[3], "Expert Explanation");
    }

    #[test]
    fn adapt_marks_completion_and_next_concept_skips_it() {
        let planner = planner();
        let kv = KnowledgeVector::from_pairs([("A", 0.8), ("B", 0.1)]);
        let path = planner
            .generate_path(&kv, &[], &PathRequest::default())
            .unwrap();

        let latest = KnowledgeVector::from_pairs([("A", 0.9)]);
        let adapted = planner.adapt_path(&path, &latest);
        assert_eq!(adapted[0].status, Some(NodeStatus::Completed));
        assert_eq!(adapted[0].taxonomy, TaxonomyTier::Create);
        assert_eq!(adapted[1].status, Some(NodeStatus::InProgress));
        assert_eq!(adapted[1].mastery, 0.1);

        let next = planner.next_concept(&adapted, &latest).unwrap();
        assert_eq!(next.concept_id, "B");
        assert_eq!(planner.estimate_duration(&adapted), 60);
    }
}
