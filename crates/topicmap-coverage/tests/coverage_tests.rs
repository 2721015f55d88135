use std::collections::{BTreeMap, BTreeSet};

use topicmap_core::config::AnalysisConfig;
use topicmap_core::evidence::{ExternalEvidence, SerpGap};
use topicmap_core::types::{
    EntityRef, IntentLabel, Page, Topic, TopicLevel, TopicTree,
};
use topicmap_coverage::{compute_matrix, detect_gaps, Dimension, RecommendationKind};
use topicmap_graph::EntityGraph;

fn page(id: &str, entities: &[&str], intents: &[IntentLabel]) -> Page {
    Page {
        page_id: id.to_string(),
        embedding: None,
        entities: entities.iter().map(|e| EntityRef::new(*e)).collect(),
        intents: intents.iter().copied().collect(),
        attributes: BTreeSet::new(),
        questions: Vec::new(),
    }
}

fn topic(
    id: &str,
    level: TopicLevel,
    parent: Option<&str>,
    members: &[&str],
    entities: &[&str],
) -> Topic {
    Topic {
        topic_id: id.to_string(),
        level,
        label: id.to_string(),
        member_pages: members.iter().map(ToString::to_string).collect(),
        parent_id: parent.map(ToString::to_string),
        entities: entities.iter().map(|e| EntityRef::new(*e)).collect(),
        intent_flow: Vec::new(),
    }
}

/// One core with two sub topics; the second sub has two micro children.
fn sibling_tree() -> TopicTree {
    let topics = [
        topic("core:a", TopicLevel::Core, None, &["a", "b", "c"], &["solar", "battery", "grid", "inverter"]),
        topic("sub:a", TopicLevel::Sub, Some("core:a"), &["a"], &["solar", "battery"]),
        topic("sub:b", TopicLevel::Sub, Some("core:a"), &["b", "c"], &["solar", "grid", "inverter"]),
        topic("micro:a", TopicLevel::Micro, Some("sub:a"), &["a"], &["solar", "battery"]),
        topic("micro:b", TopicLevel::Micro, Some("sub:b"), &["b"], &["solar", "grid"]),
        topic("micro:c", TopicLevel::Micro, Some("sub:b"), &["c"], &["solar", "inverter"]),
    ];
    TopicTree {
        topics: topics.into_iter().map(|t| (t.topic_id.clone(), t)).collect(),
        excluded_pages: Vec::new(),
    }
}

fn sibling_pages() -> Vec<Page> {
    vec![
        page("a", &["solar", "battery"], &[IntentLabel::Informational]),
        page("b", &["solar", "grid"], &[IntentLabel::Informational, IntentLabel::Comparative]),
        page("c", &["solar", "inverter"], &[IntentLabel::Informational]),
    ]
}

fn cell_score(cells: &[topicmap_coverage::CoverageCell], id: &str, dim: Dimension) -> f64 {
    cells
        .iter()
        .find(|c| c.topic_id == id && c.dimension == dim)
        .map(|c| c.score)
        .expect("cell")
}

#[test]
fn entity_score_against_sibling_baseline() {
    let tree = sibling_tree();
    let cells = compute_matrix(&tree, &sibling_pages(), &ExternalEvidence::default());
    // sub:a expects sub:b's {solar, grid, inverter}; it has solar only.
    let score = cell_score(&cells, "sub:a", Dimension::Entity);
    assert!((score - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn lone_topic_has_vacuous_entity_coverage() {
    let tree = sibling_tree();
    let cells = compute_matrix(&tree, &sibling_pages(), &ExternalEvidence::default());
    // core:a has no siblings: empty expected set, full coverage.
    assert_eq!(cell_score(&cells, "core:a", Dimension::Entity), 1.0);
}

#[test]
fn single_intent_scores_one_seventh() {
    let tree = sibling_tree();
    let cells = compute_matrix(&tree, &sibling_pages(), &ExternalEvidence::default());
    let score = cell_score(&cells, "micro:a", Dimension::Intent);
    assert!((score - 1.0 / 7.0).abs() < 1e-12);
}

#[test]
fn serp_and_depth_cells_pass_evidence_through() {
    let tree = sibling_tree();
    let mut evidence = ExternalEvidence::default();
    evidence.serp.insert(
        "micro:a".to_string(),
        SerpGap {
            paa_missing: BTreeSet::from(["how long do batteries last?".to_string()]),
            format_missing: BTreeSet::from(["comparison table".to_string()]),
        },
    );
    let cells = compute_matrix(&tree, &sibling_pages(), &evidence);
    assert!(cell_score(&cells, "micro:a", Dimension::Serp) < 1.0);
    assert!(cell_score(&cells, "micro:a", Dimension::Depth) < 1.0);
    assert_eq!(cell_score(&cells, "micro:b", Dimension::Serp), 1.0);
}

#[test]
fn linking_score_reflects_recorded_references() {
    let tree = sibling_tree();
    let mut evidence = ExternalEvidence::default();
    evidence
        .cross_references
        .insert("micro:b".to_string(), BTreeSet::from(["micro:c".to_string()]));
    let cells = compute_matrix(&tree, &sibling_pages(), &evidence);
    assert_eq!(cell_score(&cells, "micro:b", Dimension::Linking), 1.0);
    assert_eq!(cell_score(&cells, "micro:c", Dimension::Linking), 1.0);
    // micro:a has no siblings under sub:a: vacuous.
    assert_eq!(cell_score(&cells, "micro:a", Dimension::Linking), 1.0);
}

#[test]
fn low_intent_micro_draws_update_page() {
    let tree = sibling_tree();
    let pages = sibling_pages();
    let config = AnalysisConfig { i_min: 0.3, e_min: 0.0, ..AnalysisConfig::default() };
    let cells = compute_matrix(&tree, &pages, &ExternalEvidence::default());
    let graph = EntityGraph::build(&pages);
    let recs = detect_gaps(&tree, &cells, &graph, &ExternalEvidence::default(), &config);

    // 1/7 < 0.3 for the single-intent micros.
    assert!(recs
        .iter()
        .any(|r| r.kind == RecommendationKind::UpdatePage && r.target_topic_id == "micro:a"));
}

#[test]
fn healthy_micro_draws_no_update_page() {
    let tree = sibling_tree();
    let pages = vec![
        page("a", &["solar", "battery"], &IntentLabel::ALL),
        page("b", &["solar", "grid"], &IntentLabel::ALL),
        page("c", &["solar", "inverter"], &IntentLabel::ALL),
    ];
    let config = AnalysisConfig { e_min: 0.0, ..AnalysisConfig::default() };
    let cells = compute_matrix(&tree, &pages, &ExternalEvidence::default());
    let graph = EntityGraph::build(&pages);
    let recs = detect_gaps(&tree, &cells, &graph, &ExternalEvidence::default(), &config);
    assert!(!recs.iter().any(|r| r.kind == RecommendationKind::UpdatePage));
}

#[test]
fn uncovered_sibling_baseline_draws_new_page() {
    let tree = sibling_tree();
    let pages = sibling_pages();
    // sub:a misses {grid, inverter} and its only micro child covers
    // neither: a cluster void.
    let cells = compute_matrix(&tree, &pages, &ExternalEvidence::default());
    let graph = EntityGraph::build(&pages);
    let recs = detect_gaps(
        &tree,
        &cells,
        &graph,
        &ExternalEvidence::default(),
        &AnalysisConfig::default(),
    );
    let new_page = recs
        .iter()
        .find(|r| r.kind == RecommendationKind::NewPage)
        .expect("cluster void detected");
    assert_eq!(new_page.target_topic_id, "sub:a");
    assert!(new_page.evidence.cluster_gap);
    assert!(new_page.evidence.entities_missing.contains("grid"));
}

#[test]
fn unlinked_siblings_with_shared_entities_draw_internal_link() {
    let mut tree = sibling_tree();
    // Make micro:b and micro:c share three entities.
    for id in ["micro:b", "micro:c"] {
        let t = tree.topics.get_mut(id).expect("topic");
        t.entities = ["solar", "grid", "inverter"].iter().map(|e| EntityRef::new(*e)).collect();
    }
    let pages = vec![
        page("b", &["solar", "grid", "inverter"], &[IntentLabel::Informational]),
        page("c", &["solar", "grid", "inverter"], &[IntentLabel::Informational]),
    ];
    let cells = compute_matrix(&tree, &pages, &ExternalEvidence::default());
    let graph = EntityGraph::build(&pages);
    let recs = detect_gaps(
        &tree,
        &cells,
        &graph,
        &ExternalEvidence::default(),
        &AnalysisConfig::default(),
    );
    let link = recs
        .iter()
        .find(|r| r.kind == RecommendationKind::InternalLink)
        .expect("link recommended");
    assert_eq!(link.target_topic_id, "micro:b");
    assert!(link.instructions.contains("anchor"));

    // A recorded reference suppresses the recommendation.
    let mut evidence = ExternalEvidence::default();
    evidence
        .cross_references
        .insert("micro:c".to_string(), BTreeSet::from(["micro:b".to_string()]));
    let cells = compute_matrix(&tree, &pages, &evidence);
    let recs = detect_gaps(&tree, &cells, &graph, &evidence, &AnalysisConfig::default());
    assert!(!recs.iter().any(|r| r.kind == RecommendationKind::InternalLink));
}

#[test]
fn recommendations_sort_by_priority_then_topic_id() {
    let tree = sibling_tree();
    let pages = sibling_pages();
    let cells = compute_matrix(&tree, &pages, &ExternalEvidence::default());
    let graph = EntityGraph::build(&pages);
    let recs = detect_gaps(
        &tree,
        &cells,
        &graph,
        &ExternalEvidence::default(),
        &AnalysisConfig::default(),
    );
    for pair in recs.windows(2) {
        assert!(
            pair[0].priority_score > pair[1].priority_score
                || (pair[0].priority_score == pair[1].priority_score
                    && pair[0].target_topic_id <= pair[1].target_topic_id)
        );
    }
}

#[test]
fn matrix_is_rebuilt_identically() {
    let tree = sibling_tree();
    let pages = sibling_pages();
    let one = serde_json::to_string(&compute_matrix(&tree, &pages, &ExternalEvidence::default()))
        .expect("json");
    let two = serde_json::to_string(&compute_matrix(&tree, &pages, &ExternalEvidence::default()))
        .expect("json");
    assert_eq!(one, two);
}
