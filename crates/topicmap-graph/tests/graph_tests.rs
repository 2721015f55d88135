use std::collections::{BTreeMap, BTreeSet};

use topicmap_core::types::{
    EntityRef, IntentLabel, Page, Topic, TopicLevel, TopicTree,
};
use topicmap_graph::{build_intent_graphs, EntityGraph};

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

fn single_core_tree(members: &[&str]) -> TopicTree {
    let member_pages: BTreeSet<String> = members.iter().map(ToString::to_string).collect();
    let mut topics = BTreeMap::new();
    for (level, id, parent) in [
        (TopicLevel::Core, "core:a", None),
        (TopicLevel::Sub, "sub:a", Some("core:a")),
        (TopicLevel::Micro, "micro:a", Some("sub:a")),
    ] {
        topics.insert(
            id.to_string(),
            Topic {
                topic_id: id.to_string(),
                level,
                label: "test".to_string(),
                member_pages: member_pages.clone(),
                parent_id: parent.map(ToString::to_string),
                entities: BTreeSet::new(),
                intent_flow: Vec::new(),
            },
        );
    }
    TopicTree { topics, excluded_pages: Vec::new() }
}

#[test]
fn entity_weights_are_normalized_to_unit_interval() {
    let pages = vec![
        page("a", &["solar", "battery", "inverter"], &[]),
        page("b", &["solar", "battery"], &[]),
        page("c", &["solar", "battery"], &[]),
    ];
    let graph = EntityGraph::build(&pages);

    assert_eq!(graph.weight("solar", "battery"), Some(1.0));
    for edge in &graph.edges {
        assert!((0.0..=1.0).contains(&edge.weight));
        assert_ne!(edge.a, edge.b, "no self-loops");
    }
}

#[test]
fn weight_lookup_is_symmetric() {
    let pages = vec![page("a", &["solar", "battery"], &[])];
    let graph = EntityGraph::build(&pages);
    assert_eq!(graph.weight("solar", "battery"), graph.weight("battery", "solar"));
    assert_eq!(graph.weight("solar", "grid"), None);
}

#[test]
fn single_page_entities_stay_as_isolated_nodes() {
    let pages = vec![
        page("a", &["solar", "battery"], &[]),
        page("b", &["permaculture"], &[]),
    ];
    let graph = EntityGraph::build(&pages);
    assert!(graph.nodes.contains("permaculture"));
    assert_eq!(graph.weighted_degree("permaculture"), 0.0);
}

#[test]
fn empty_corpus_gives_an_empty_entity_graph() {
    let graph = EntityGraph::build(&[]);
    assert!(graph.nodes.is_empty());
    assert!(graph.edges.is_empty());
}

#[test]
fn intent_out_weights_sum_to_at_most_one() {
    let pages = vec![
        page("a", &[], &[IntentLabel::Informational, IntentLabel::Comparative]),
        page(
            "b",
            &[],
            &[
                IntentLabel::Informational,
                IntentLabel::Transactional,
                IntentLabel::Objections,
            ],
        ),
        page("c", &[], &[IntentLabel::Informational, IntentLabel::Comparative]),
    ];
    let tree = single_core_tree(&["a", "b", "c"]);
    let graphs = build_intent_graphs(&tree, &pages);
    let graph = &graphs["core:a"];

    for node in &graph.nodes {
        let sum = graph.out_weight_sum(*node);
        assert!(sum <= 1.0 + 1e-9, "out-weights from {node} sum to {sum}");
    }
    // informational -> comparative twice, informational -> transactional once.
    assert!((graph.out_weight_sum(IntentLabel::Informational) - 1.0).abs() < 1e-9);
    assert_eq!(
        graph.edges.iter().filter(|e| e.from == IntentLabel::Informational).count(),
        2
    );
}

#[test]
fn single_intent_topic_has_nodes_but_no_edges() {
    let pages = vec![
        page("a", &[], &[IntentLabel::Informational]),
        page("b", &[], &[IntentLabel::Informational]),
    ];
    let tree = single_core_tree(&["a", "b"]);
    let graphs = build_intent_graphs(&tree, &pages);
    let graph = &graphs["core:a"];
    assert_eq!(graph.nodes.len(), 1);
    assert!(graph.edges.is_empty());
}

#[test]
fn graphs_serialize_deterministically() {
    let pages = vec![
        page("a", &["solar", "battery"], &[IntentLabel::Informational]),
        page("b", &["solar", "grid"], &[IntentLabel::Comparative]),
    ];
    let one = serde_json::to_string(&EntityGraph::build(&pages)).expect("json");
    let two = serde_json::to_string(&EntityGraph::build(&pages)).expect("json");
    assert_eq!(one, two);
}
