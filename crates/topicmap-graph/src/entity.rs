//! Entity co-occurrence graph.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use topicmap_core::types::Page;

/// One undirected edge, stored once with `a < b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEdge {
    pub a: String,
    pub b: String,
    /// Raw number of pages on which both entities appear.
    pub cooccurrences: u64,
    /// Raw count min-max normalized by the run's maximum raw count, so
    /// weights are run-relative. Comparing weights across runs is a
    /// non-goal.
    pub weight: f64,
}

/// Undirected weighted co-occurrence graph over canonical entity keys.
///
/// Isolated entities (seen on exactly one page, co-occurring with
/// nothing) stay in the node set at degree zero: an isolated high-value
/// entity is itself a gap signal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityGraph {
    pub nodes: BTreeSet<String>,
    /// Sorted by `(a, b)`.
    pub edges: Vec<EntityEdge>,
}

impl EntityGraph {
    pub fn build(pages: &[Page]) -> Self {
        let mut nodes: BTreeSet<String> = BTreeSet::new();
        let mut counts: BTreeMap<(String, String), u64> = BTreeMap::new();

        for page in pages {
            let keys: Vec<&str> = page.entities.iter().map(|e| e.key.as_str()).collect();
            nodes.extend(keys.iter().map(ToString::to_string));
            for i in 0..keys.len() {
                for j in (i + 1)..keys.len() {
                    // BTreeSet iteration is sorted, so keys[i] < keys[j]
                    // and self-loops cannot arise.
                    *counts
                        .entry((keys[i].to_string(), keys[j].to_string()))
                        .or_insert(0) += 1;
                }
            }
        }

        let max = counts.values().copied().max().unwrap_or(0);
        let edges = counts
            .into_iter()
            .map(|((a, b), raw)| {
                #[allow(clippy::cast_precision_loss)]
                let weight = raw as f64 / max as f64;
                EntityEdge { a, b, cooccurrences: raw, weight }
            })
            .collect();

        tracing::debug!(nodes = nodes.len(), "entity graph built");
        Self { nodes, edges }
    }

    /// Symmetric weight lookup; `None` when the entities never co-occur.
    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.edges
            .binary_search_by(|e| (e.a.as_str(), e.b.as_str()).cmp(&(lo, hi)))
            .ok()
            .map(|i| self.edges[i].weight)
    }

    /// Sum of the weights of all edges incident to `entity`.
    pub fn weighted_degree(&self, entity: &str) -> f64 {
        self.edges
            .iter()
            .filter(|e| e.a == entity || e.b == entity)
            .map(|e| e.weight)
            .sum()
    }
}
