//! Property-based tests for learning path generation.
//!
//! - Every node's prerequisites are known at the prerequisite threshold
//! - No node is already mastered
//! - No node is harder than the requested maximum
//! - Positions run 1..=len and the path never exceeds `num_concepts`

use std::sync::Arc;

use proptest::prelude::*;

use tutor_engine::tutor::config::PathParams;
use tutor_engine::tutor::path::{LearningPathPlanner, PathRequest, PreferenceMode};
use tutor_engine::tutor::{Concept, ConceptCatalog, KnowledgeVector};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_f64_0_1() -> impl Strategy<Value = f64> {
    (0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)
}

/// Concepts `c0..cN`; each may require any subset of the earlier ones.
fn arb_catalog() -> impl Strategy<Value = ConceptCatalog> {
    prop::collection::vec((arb_f64_0_1(), prop::collection::vec(any::<bool>(), 8)), 1..8)
        .prop_map(|specs| {
            let concepts = specs
                .iter()
                .enumerate()
                .map(|(i, (difficulty, picks))| {
                    let prerequisites = (0..i).filter(|&j| picks[j]).map(|j| format!("c{j}"));
                    Concept::new(format!("c{i}"))
                        .with_difficulty(*difficulty)
                        .with_prerequisites(prerequisites)
                })
                .collect();
            ConceptCatalog::new(concepts).expect("generated catalog is acyclic")
        })
}

fn arb_preference() -> impl Strategy<Value = PreferenceMode> {
    prop_oneof![
        Just(PreferenceMode::Balanced),
        Just(PreferenceMode::Progressive),
        Just(PreferenceMode::Review),
        Just(PreferenceMode::Fallback),
    ]
}

/// A catalog plus knowledge, weak set and request drawn over its concepts.
fn arb_scenario(
) -> impl Strategy<Value = (ConceptCatalog, KnowledgeVector, Vec<String>, PathRequest)> {
    arb_catalog().prop_flat_map(|catalog| {
        let n = catalog.len();
        (
            Just(catalog),
            prop::collection::vec(prop::option::of(arb_f64_0_1()), n),
            prop::collection::vec(any::<bool>(), n),
            0usize..10,
            arb_f64_0_1(),
            arb_preference(),
        )
            .prop_map(|(catalog, masteries, weak_flags, num, max_difficulty, preference)| {
                let knowledge = KnowledgeVector::from_pairs(
                    masteries
                        .iter()
                        .enumerate()
                        .filter_map(|(i, m)| m.map(|m| (format!("c{i}"), m))),
                );
                let weak = weak_flags
                    .iter()
                    .enumerate()
                    .filter(|(_, w)| **w)
                    .map(|(i, _)| format!("c{i}"))
                    .collect();
                let request = PathRequest::default()
                    .with_num_concepts(num)
                    .with_max_difficulty(max_difficulty)
                    .with_preference(preference);
                (catalog, knowledge, weak, request)
            })
    })
}

// ============================================================================
// Path invariants
// ============================================================================

proptest! {
    #[test]
    fn every_node_is_learnable(scenario in arb_scenario()) {
        let (catalog, knowledge, weak, request) = scenario;
        let params = PathParams::default();
        let catalog = Arc::new(catalog);
        let planner = LearningPathPlanner::new(catalog.clone(), params.clone());

        let path = planner.generate_path(&knowledge, &weak, &request).unwrap();

        prop_assert!(path.len() <= request.num_concepts);
        for (i, node) in path.iter().enumerate() {
            prop_assert_eq!(node.position, i + 1);

            let concept = catalog.get(&node.concept_id).unwrap();
            prop_assert!(concept.difficulty <= request.max_difficulty);
            prop_assert!(knowledge.mastery_or(&node.concept_id, 0.0) < params.mastered_threshold);
            for prerequisite in &concept.prerequisites {
                prop_assert!(
                    knowledge.mastery_or(prerequisite, 0.0) >= params.prerequisite_threshold,
                    "{} entered the path without {}",
                    node.concept_id,
                    prerequisite
                );
            }
        }
    }

    #[test]
    fn nodes_are_distinct(scenario in arb_scenario()) {
        let (catalog, knowledge, weak, request) = scenario;
        let planner = LearningPathPlanner::new(Arc::new(catalog), PathParams::default());
        let path = planner.generate_path(&knowledge, &weak, &request).unwrap();

        let mut ids: Vec<_> = path.iter().map(|n| n.concept_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), path.len());
    }
}
