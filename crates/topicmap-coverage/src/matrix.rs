//! The (topic x dimension) coverage matrix.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use topicmap_core::evidence::ExternalEvidence;
use topicmap_core::types::{IntentLabel, Page, Topic, TopicId, TopicTree};

/// One axis along which topical completeness is scored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Entity,
    Intent,
    Serp,
    Depth,
    Linking,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Entity,
        Dimension::Intent,
        Dimension::Serp,
        Dimension::Depth,
        Dimension::Linking,
    ];
}

/// Score and missing-item set for one (topic, dimension) cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageCell {
    pub topic_id: TopicId,
    pub dimension: Dimension,
    pub score: f64,
    pub missing: BTreeSet<String>,
    pub evidence: Vec<String>,
}

/// Compute every cell for every topic, ordered by (topic_id, dimension).
pub fn compute_matrix(
    tree: &TopicTree,
    pages: &[Page],
    evidence: &ExternalEvidence,
) -> Vec<CoverageCell> {
    let by_id: BTreeMap<&str, &Page> = pages.iter().map(|p| (p.page_id.as_str(), p)).collect();
    let mut cells = Vec::with_capacity(tree.topics.len() * Dimension::ALL.len());
    for topic in tree.topics.values() {
        cells.push(entity_cell(tree, topic));
        cells.push(intent_cell(topic, &by_id));
        cells.push(serp_cell(topic, evidence));
        cells.push(depth_cell(topic, evidence));
        cells.push(linking_cell(tree, topic, evidence));
    }
    cells.sort_by(|a, b| (&a.topic_id, a.dimension).cmp(&(&b.topic_id, b.dimension)));
    tracing::debug!(cells = cells.len(), "coverage matrix computed");
    cells
}

/// Expected entity set = union of what sibling topics at the same level
/// cover; with no siblings the expectation is empty and coverage is
/// vacuously full (score 1.0).
fn entity_cell(tree: &TopicTree, topic: &Topic) -> CoverageCell {
    let mut expected: BTreeSet<&str> = BTreeSet::new();
    for sibling in tree.siblings(topic) {
        expected.extend(sibling.entities.iter().map(|e| e.key.as_str()));
    }
    let present: BTreeSet<&str> = topic.entities.iter().map(|e| e.key.as_str()).collect();

    let (score, missing) = if expected.is_empty() {
        (1.0, BTreeSet::new())
    } else {
        let hit = expected.intersection(&present).count();
        #[allow(clippy::cast_precision_loss)]
        let score = hit as f64 / expected.len() as f64;
        let missing = expected.difference(&present).map(ToString::to_string).collect();
        (score, missing)
    };

    // Pages attached by fallback surface here as evidence.
    let mut cell_evidence = Vec::new();
    for excluded in &tree.excluded_pages {
        if topic.member_pages.contains(&excluded.page_id) {
            cell_evidence.push(format!(
                "page {} excluded from embedding clustering: {}",
                excluded.page_id, excluded.reason
            ));
        }
    }

    CoverageCell {
        topic_id: topic.topic_id.clone(),
        dimension: Dimension::Entity,
        score,
        missing,
        evidence: cell_evidence,
    }
}

fn intent_cell(topic: &Topic, by_id: &BTreeMap<&str, &Page>) -> CoverageCell {
    let mut present: BTreeSet<IntentLabel> = BTreeSet::new();
    for id in &topic.member_pages {
        if let Some(page) = by_id.get(id.as_str()) {
            present.extend(page.intents.iter().copied());
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let score = present.len() as f64 / IntentLabel::TAXONOMY_SIZE as f64;
    let missing = IntentLabel::ALL
        .iter()
        .filter(|l| !present.contains(l))
        .map(|l| l.to_string())
        .collect();
    CoverageCell {
        topic_id: topic.topic_id.clone(),
        dimension: Dimension::Intent,
        score,
        missing,
        evidence: Vec::new(),
    }
}

/// List size mapped monotonically onto (0, 1]; an empty list is full
/// coverage. The lists themselves are pass-through evidence, not computed
/// here.
fn list_score(n: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        1.0 / (1.0 + n as f64)
    }
}

fn serp_cell(topic: &Topic, evidence: &ExternalEvidence) -> CoverageCell {
    let paa = evidence
        .serp_for(&topic.topic_id)
        .map(|g| g.paa_missing.clone())
        .unwrap_or_default();
    CoverageCell {
        topic_id: topic.topic_id.clone(),
        dimension: Dimension::Serp,
        score: list_score(paa.len()),
        missing: paa,
        evidence: Vec::new(),
    }
}

fn depth_cell(topic: &Topic, evidence: &ExternalEvidence) -> CoverageCell {
    let formats = evidence
        .serp_for(&topic.topic_id)
        .map(|g| g.format_missing.clone())
        .unwrap_or_default();
    CoverageCell {
        topic_id: topic.topic_id.clone(),
        dimension: Dimension::Depth,
        score: list_score(formats.len()),
        missing: formats,
        evidence: Vec::new(),
    }
}

fn linking_cell(tree: &TopicTree, topic: &Topic, evidence: &ExternalEvidence) -> CoverageCell {
    let siblings: BTreeSet<TopicId> =
        tree.siblings(topic).map(|t| t.topic_id.clone()).collect();
    if siblings.is_empty() {
        return CoverageCell {
            topic_id: topic.topic_id.clone(),
            dimension: Dimension::Linking,
            score: 1.0,
            missing: BTreeSet::new(),
            evidence: Vec::new(),
        };
    }
    let linked = siblings
        .iter()
        .filter(|s| evidence.linked(&topic.topic_id, s))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let score = linked as f64 / siblings.len() as f64;
    let missing = siblings
        .into_iter()
        .filter(|s| !evidence.linked(&topic.topic_id, s))
        .collect();
    CoverageCell {
        topic_id: topic.topic_id.clone(),
        dimension: Dimension::Linking,
        score,
        missing,
        evidence: Vec::new(),
    }
}
