//! Run orchestration: one corpus snapshot in, the full artifact set out.
//!
//! Stage order enforces the dataflow contract: similarity feeds
//! clustering; the entity and intent graph builders read only the
//! immutable page set and the finished tree; coverage and gap detection
//! start strictly after every graph is final. A run either returns the
//! complete `TopicalAnalysis` or an error and nothing — there is no
//! partial result.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use topicmap_core::config::AnalysisConfig;
use topicmap_core::error::Result;
use topicmap_core::evidence::ExternalEvidence;
use topicmap_core::types::{Page, TopicId, TopicTree};
use topicmap_coverage::{CoverageCell, Recommendation};
use topicmap_graph::{EntityGraph, IntentGraph};
use topicmap_similarity::SimilarityMatrix;

/// Every artifact of one analysis run, serializable as a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicalAnalysis {
    pub tree: TopicTree,
    pub entity_graph: EntityGraph,
    pub intent_graphs: BTreeMap<TopicId, IntentGraph>,
    pub coverage: Vec<CoverageCell>,
    pub recommendations: Vec<Recommendation>,
}

/// Run the full analysis over one corpus snapshot.
///
/// Configuration is validated before any computation; an empty corpus
/// yields empty artifacts rather than an error.
pub fn run(
    pages: &[Page],
    evidence: &ExternalEvidence,
    config: &AnalysisConfig,
) -> Result<TopicalAnalysis> {
    config.validate()?;
    tracing::info!(pages = pages.len(), "analysis run started");

    let matrix = SimilarityMatrix::build(pages);
    let tree = topicmap_cluster::build_tree(pages, &matrix, config)?;

    // Both builders read the same immutable inputs and write disjoint
    // graphs; nothing downstream starts until both are done.
    let entity_graph = EntityGraph::build(pages);
    let intent_graphs = topicmap_graph::build_intent_graphs(&tree, pages);

    let coverage = topicmap_coverage::compute_matrix(&tree, pages, evidence);
    let recommendations =
        topicmap_coverage::detect_gaps(&tree, &coverage, &entity_graph, evidence, config);

    tracing::info!(
        topics = tree.topics.len(),
        cells = coverage.len(),
        recommendations = recommendations.len(),
        "analysis run finished"
    );
    Ok(TopicalAnalysis { tree, entity_graph, intent_graphs, coverage, recommendations })
}
