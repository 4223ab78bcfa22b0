//! Learning path generation against the arithmetic fixture catalog.

mod common;

use std::sync::Arc;

use tutor_engine::tutor::config::PathParams;
use tutor_engine::tutor::path::{LearningPathPlanner, NodeStatus, PathRequest, PreferenceMode};
use tutor_engine::tutor::{Concept, ConceptCatalog, KnowledgeVector, TaxonomyTier, TutorError};

fn planner() -> LearningPathPlanner {
    LearningPathPlanner::new(Arc::new(common::arithmetic_catalog()), PathParams::default())
}

#[test]
fn beginner_only_sees_unlocked_concepts() {
    let path = planner()
        .generate_path(&KnowledgeVector::new(), &[], &PathRequest::default())
        .unwrap();
    let ids: Vec<_> = path.iter().map(|n| n.concept_id.as_str()).collect();
    // addition is gated, calculus is too hard
    assert_eq!(ids, vec!["counting"]);
    assert_eq!(path[0].taxonomy, TaxonomyTier::Remember);
}

#[test]
fn mastered_and_too_hard_concepts_are_excluded() {
    let kv = KnowledgeVector::from_pairs([
        ("counting", 0.95),
        ("addition", 0.7),
        ("multiplication", 0.2),
        ("calculus", 0.0),
    ]);
    let path = planner()
        .generate_path(&kv, &[], &PathRequest::default())
        .unwrap();
    let ids: Vec<_> = path.iter().map(|n| n.concept_id.as_str()).collect();
    assert_eq!(ids, vec!["addition", "multiplication"]);
    assert_eq!(path[1].position, 2);

    let wide = PathRequest::default().with_max_difficulty(1.0);
    let path = planner().generate_path(&kv, &[], &wide).unwrap();
    assert!(path.iter().any(|n| n.concept_id == "calculus"));
}

#[test]
fn num_concepts_truncates_by_priority() {
    let kv = KnowledgeVector::from_pairs([
        ("counting", 0.7),
        ("addition", 0.65),
        ("multiplication", 0.1),
    ]);
    let request = PathRequest::default()
        .with_num_concepts(1)
        .with_max_difficulty(1.0);
    let path = planner().generate_path(&kv, &[], &request).unwrap();
    assert_eq!(path.len(), 1);
    // calculus: 0.5 * 1.0 + 0.3 * 0.9 = 0.77 beats multiplication at 0.6
    assert_eq!(path[0].concept_id, "calculus");
}

#[test]
fn weak_boost_changes_ranking() {
    let kv = KnowledgeVector::from_pairs([("counting", 0.62), ("addition", 0.7)]);
    let request = PathRequest::default()
        .with_num_concepts(1)
        .with_max_difficulty(0.4);

    let plain = planner().generate_path(&kv, &[], &request).unwrap();
    assert_eq!(plain[0].concept_id, "addition");

    let boosted = planner()
        .generate_path(&kv, &["counting".to_string()], &request)
        .unwrap();
    assert_eq!(boosted[0].concept_id, "counting");
}

#[test]
fn preference_modes_rank_differently() {
    let kv = KnowledgeVector::from_pairs([
        ("counting", 0.7),
        ("addition", 0.65),
        ("multiplication", 0.3),
    ]);
    let request = PathRequest::default()
        .with_num_concepts(1)
        .with_preference(PreferenceMode::parse("progressive"));
    let path = planner().generate_path(&kv, &[], &request).unwrap();
    assert_eq!(path[0].concept_id, "multiplication");

    let fallback = PathRequest::default()
        .with_num_concepts(3)
        .with_preference(PreferenceMode::parse("cram"));
    assert_eq!(fallback.preference, PreferenceMode::Fallback);
    assert_eq!(planner().generate_path(&kv, &[], &fallback).unwrap().len(), 3);
}

#[test]
fn invalid_inputs_are_rejected() {
    let err = planner()
        .generate_path(
            &KnowledgeVector::from_pairs([("geometry", 0.1)]),
            &[],
            &PathRequest::default(),
        )
        .unwrap_err();
    assert_eq!(err, TutorError::UnknownConcept("geometry".into()));

    let err = planner()
        .generate_path(
            &KnowledgeVector::new(),
            &[],
            &PathRequest::default().with_max_difficulty(1.5),
        )
        .unwrap_err();
    assert!(matches!(err, TutorError::InvalidParameter { name: "max_difficulty", .. }));
}

#[test]
fn generate_then_adapt_round_trip() {
    let planner = planner();
    let kv = KnowledgeVector::from_pairs([("counting", 0.7), ("addition", 0.65)]);
    let path = planner.generate_path(&kv, &[], &PathRequest::default()).unwrap();

    assert_eq!(path.len(), 3);
    let adapted = planner.adapt_path(&path, &kv);
    assert_eq!(adapted.len(), path.len());
    for (before, after) in path.iter().zip(&adapted) {
        assert_eq!(before.concept_id, after.concept_id);
        assert_eq!(before.position, after.position);
        assert_eq!(before.mastery, after.mastery);
        assert_eq!(after.status, Some(NodeStatus::InProgress));
    }

    let progressed = KnowledgeVector::from_pairs([
        ("counting", 0.9),
        ("addition", 0.9),
        ("multiplication", 0.9),
    ]);
    let adapted = planner.adapt_path(&path, &progressed);
    assert!(adapted.iter().all(|n| n.status == Some(NodeStatus::Completed)));
    assert!(planner.next_concept(&adapted, &progressed).is_none());
}

#[test]
fn ordering_is_heuristic_not_topological() {
    // a -> b -> c: b and c each have one selected prerequisite, c is easier
    let catalog = ConceptCatalog::new(vec![
        Concept::new("a").with_difficulty(0.5),
        Concept::new("b").with_difficulty(0.6).with_prerequisites(["a"]),
        Concept::new("c").with_difficulty(0.3).with_prerequisites(["b"]),
    ])
    .unwrap();
    let planner = LearningPathPlanner::new(Arc::new(catalog), PathParams::default());
    let kv = KnowledgeVector::from_pairs([("a", 0.7), ("b", 0.7), ("c", 0.0)]);

    let path = planner
        .generate_path(&kv, &[], &PathRequest::default())
        .unwrap();
    let ids: Vec<_> = path.iter().map(|n| n.concept_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c", "b"]);
    assert_eq!(path[1].position, 2);
}

#[test]
fn deserialized_knowledge_is_clamped_before_planning() {
    let kv: KnowledgeVector =
        serde_json::from_str(r#"{"counting": 5.0, "addition": -3.0}"#).unwrap();
    assert_eq!(kv.get("counting"), Some(1.0));
    assert_eq!(kv.get("addition"), Some(0.0));

    let path = planner()
        .generate_path(&kv, &[], &PathRequest::default())
        .unwrap();
    assert!(path.iter().all(|n| (0.0..=1.0).contains(&n.mastery)));
    assert!(path.iter().all(|n| n.concept_id != "counting"));
}
