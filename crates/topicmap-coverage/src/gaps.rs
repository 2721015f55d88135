//! Deterministic rule engine turning the coverage matrix into ranked,
//! evidence-backed recommendations.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use topicmap_core::config::AnalysisConfig;
use topicmap_core::evidence::ExternalEvidence;
use topicmap_core::types::{Topic, TopicId, TopicLevel, TopicTree};
use topicmap_graph::EntityGraph;

use crate::matrix::{CoverageCell, Dimension};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationKind {
    NewPage,
    UpdatePage,
    InternalLink,
}

/// The evidence bundle attached to every recommendation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationEvidence {
    pub entities_missing: BTreeSet<String>,
    pub intents_missing: BTreeSet<String>,
    pub paa_missing: BTreeSet<String>,
    pub cluster_gap: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub target_topic_id: TopicId,
    pub evidence: RecommendationEvidence,
    pub priority_score: f64,
    pub instructions: String,
}

struct CellIndex<'a> {
    cells: BTreeMap<(&'a str, Dimension), &'a CoverageCell>,
    /// Run maximum of |paa_missing|, for min-max normalization.
    max_paa: usize,
}

impl<'a> CellIndex<'a> {
    fn new(matrix: &'a [CoverageCell]) -> Self {
        let cells = matrix
            .iter()
            .map(|c| ((c.topic_id.as_str(), c.dimension), c))
            .collect();
        let max_paa = matrix
            .iter()
            .filter(|c| c.dimension == Dimension::Serp)
            .map(|c| c.missing.len())
            .max()
            .unwrap_or(0);
        Self { cells, max_paa }
    }

    fn get(&self, topic_id: &str, dimension: Dimension) -> Option<&CoverageCell> {
        self.cells.get(&(topic_id, dimension)).copied()
    }

    fn score(&self, topic_id: &str, dimension: Dimension) -> f64 {
        self.get(topic_id, dimension).map_or(1.0, |c| c.score)
    }

    fn serp_gap_normalized(&self, topic_id: &str) -> f64 {
        if self.max_paa == 0 {
            return 0.0;
        }
        let n = self.get(topic_id, Dimension::Serp).map_or(0, |c| c.missing.len());
        #[allow(clippy::cast_precision_loss)]
        {
            n as f64 / self.max_paa as f64
        }
    }

    /// `w1*(1-entity) + w2*(1-intent) + w3*serp_norm + w4*cluster_flag`.
    fn priority(&self, topic_id: &str, cluster_gap: bool, config: &AnalysisConfig) -> f64 {
        let w = &config.weights;
        w.entity * (1.0 - self.score(topic_id, Dimension::Entity))
            + w.intent * (1.0 - self.score(topic_id, Dimension::Intent))
            + w.serp * self.serp_gap_normalized(topic_id)
            + w.cluster * f64::from(u8::from(cluster_gap))
    }
}

/// Scan the finished matrix and emit recommendations, stable-sorted
/// descending by priority with ties broken by target topic id.
pub fn detect_gaps(
    tree: &TopicTree,
    matrix: &[CoverageCell],
    entity_graph: &EntityGraph,
    evidence: &ExternalEvidence,
    config: &AnalysisConfig,
) -> Vec<Recommendation> {
    let index = CellIndex::new(matrix);
    let mut out = Vec::new();

    update_page_rules(tree, &index, config, &mut out);
    new_page_rules(tree, &index, config, &mut out);
    internal_link_rules(tree, &index, entity_graph, evidence, config, &mut out);

    out.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.target_topic_id.cmp(&b.target_topic_id))
    });
    tracing::info!(recommendations = out.len(), "gap detection finished");
    out
}

/// Micro topic underperforming on entity or intent coverage -> update its
/// member pages.
fn update_page_rules(
    tree: &TopicTree,
    index: &CellIndex<'_>,
    config: &AnalysisConfig,
    out: &mut Vec<Recommendation>,
) {
    for micro in tree.at_level(TopicLevel::Micro) {
        let entity_score = index.score(&micro.topic_id, Dimension::Entity);
        let intent_score = index.score(&micro.topic_id, Dimension::Intent);
        if entity_score >= config.e_min && intent_score >= config.i_min {
            continue;
        }
        let entities_missing = missing_of(index, &micro.topic_id, Dimension::Entity);
        let intents_missing = missing_of(index, &micro.topic_id, Dimension::Intent);
        let paa_missing = missing_of(index, &micro.topic_id, Dimension::Serp);
        let pages = micro.member_pages.iter().cloned().collect::<Vec<_>>().join(", ");
        let instructions = format!(
            "Update {pages}: cover entities [{}]; address intents [{}]",
            join(&entities_missing),
            join(&intents_missing),
        );
        out.push(Recommendation {
            kind: RecommendationKind::UpdatePage,
            target_topic_id: micro.topic_id.clone(),
            priority_score: index.priority(&micro.topic_id, false, config),
            evidence: RecommendationEvidence {
                entities_missing,
                intents_missing,
                paa_missing,
                cluster_gap: false,
            },
            instructions,
        });
    }
}

/// Cluster void: a subtopic whose sibling baseline implies entities none
/// of its micro children touch -> a page is missing outright.
fn new_page_rules(
    tree: &TopicTree,
    index: &CellIndex<'_>,
    config: &AnalysisConfig,
    out: &mut Vec<Recommendation>,
) {
    for sub in tree.at_level(TopicLevel::Sub) {
        let missing = missing_of(index, &sub.topic_id, Dimension::Entity);
        if missing.is_empty() {
            continue;
        }
        let covered_by_child = tree.children(&sub.topic_id).any(|micro| {
            micro.entities.iter().any(|e| missing.contains(&e.key))
        });
        if covered_by_child {
            continue;
        }
        let instructions = format!(
            "Create a page under {} ({}) covering [{}]",
            sub.topic_id,
            sub.label,
            join(&missing),
        );
        out.push(Recommendation {
            kind: RecommendationKind::NewPage,
            target_topic_id: sub.topic_id.clone(),
            priority_score: index.priority(&sub.topic_id, true, config),
            evidence: RecommendationEvidence {
                entities_missing: missing,
                intents_missing: BTreeSet::new(),
                paa_missing: missing_of(index, &sub.topic_id, Dimension::Serp),
                cluster_gap: true,
            },
            instructions,
        });
    }
}

/// Sibling topics sharing enough entities but never cross-referencing
/// each other -> link them, anchored on the strongest shared entity.
fn internal_link_rules(
    tree: &TopicTree,
    index: &CellIndex<'_>,
    entity_graph: &EntityGraph,
    evidence: &ExternalEvidence,
    config: &AnalysisConfig,
    out: &mut Vec<Recommendation>,
) {
    for level in [TopicLevel::Core, TopicLevel::Sub, TopicLevel::Micro] {
        let topics: Vec<&Topic> = tree.at_level(level).collect();
        for (i, a) in topics.iter().enumerate() {
            for b in &topics[i + 1..] {
                if a.parent_id != b.parent_id {
                    continue;
                }
                let shared: BTreeSet<&str> = a
                    .entities
                    .iter()
                    .map(|e| e.key.as_str())
                    .filter(|k| b.entities.iter().any(|e| e.key == *k))
                    .collect();
                if shared.len() < config.l_min
                    || evidence.linked(&a.topic_id, &b.topic_id)
                {
                    continue;
                }
                let anchor = shared
                    .iter()
                    .map(|k| (*k, entity_graph.weighted_degree(k)))
                    .fold(None::<(&str, f64)>, |best, (k, d)| match best {
                        Some((_, bd)) if bd >= d => best,
                        _ => Some((k, d)),
                    })
                    .map(|(k, _)| k.to_string())
                    .unwrap_or_default();
                let instructions = format!(
                    "Link {} and {} using anchor \"{anchor}\"",
                    a.topic_id, b.topic_id
                );
                out.push(Recommendation {
                    kind: RecommendationKind::InternalLink,
                    target_topic_id: a.topic_id.clone(),
                    priority_score: index.priority(&a.topic_id, false, config),
                    evidence: RecommendationEvidence::default(),
                    instructions,
                });
            }
        }
    }
}

fn missing_of(index: &CellIndex<'_>, topic_id: &str, dimension: Dimension) -> BTreeSet<String> {
    index
        .get(topic_id, dimension)
        .map(|c| c.missing.clone())
        .unwrap_or_default()
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(", ")
}
