//! Per-core-topic intent transition graphs.
//!
//! Each page's observed intents are sequenced by the canonical taxonomy
//! precedence (a fixed total order used only for deterministic
//! sequencing), and every adjacent pair in that sequence counts as one
//! transition. A topic whose pages carry a single intent each yields a
//! graph with nodes and no edges, which downstream reads as shallow
//! intent coverage.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use topicmap_core::types::{IntentLabel, Page, PageId, TopicId, TopicLevel, TopicTree};

/// One directed edge of a topic's intent graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentEdge {
    pub from: IntentLabel,
    pub to: IntentLabel,
    pub transitions: u64,
    /// Transition count / total transitions out of `from` within the
    /// topic. Out-weights of a node sum to at most 1.
    pub weight: f64,
}

/// Directed intent transition graph for one core topic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentGraph {
    pub nodes: BTreeSet<IntentLabel>,
    /// Sorted by `(from, to)`.
    pub edges: Vec<IntentEdge>,
}

impl IntentGraph {
    fn build(members: &BTreeSet<PageId>, by_id: &BTreeMap<&str, &Page>) -> Self {
        let mut nodes: BTreeSet<IntentLabel> = BTreeSet::new();
        let mut counts: BTreeMap<(IntentLabel, IntentLabel), u64> = BTreeMap::new();
        let mut out_totals: BTreeMap<IntentLabel, u64> = BTreeMap::new();

        for id in members {
            let Some(page) = by_id.get(id.as_str()) else {
                continue;
            };
            nodes.extend(page.intents.iter().copied());
            let sequence: Vec<IntentLabel> = page.intents.iter().copied().collect();
            for pair in sequence.windows(2) {
                *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
                *out_totals.entry(pair[0]).or_insert(0) += 1;
            }
        }

        let edges = counts
            .into_iter()
            .map(|((from, to), transitions)| {
                #[allow(clippy::cast_precision_loss)]
                let weight = transitions as f64 / out_totals[&from] as f64;
                IntentEdge { from, to, transitions, weight }
            })
            .collect();
        Self { nodes, edges }
    }

    /// Sum of out-edge weights from `from`; ≤ 1 by construction.
    pub fn out_weight_sum(&self, from: IntentLabel) -> f64 {
        self.edges.iter().filter(|e| e.from == from).map(|e| e.weight).sum()
    }
}

/// One intent graph per core topic, keyed by core topic id.
pub fn build_intent_graphs(
    tree: &TopicTree,
    pages: &[Page],
) -> BTreeMap<TopicId, IntentGraph> {
    let by_id: BTreeMap<&str, &Page> = pages.iter().map(|p| (p.page_id.as_str(), p)).collect();
    let graphs: BTreeMap<TopicId, IntentGraph> = tree
        .at_level(TopicLevel::Core)
        .map(|core| (core.topic_id.clone(), IntentGraph::build(&core.member_pages, &by_id)))
        .collect();
    tracing::debug!(graphs = graphs.len(), "intent graphs built");
    graphs
}
