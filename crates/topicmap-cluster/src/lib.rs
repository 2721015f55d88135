//! Hierarchical clustering engine: builds the three-level topic tree.
//!
//! Pass 1 agglomerates pages into core topics over the cosine similarity
//! matrix. Pass 2 re-clusters each core topic's members by entity-set
//! Jaccard overlap at two successively tighter thresholds, yielding the
//! sub and micro levels. Pages without a usable embedding never reach
//! pass 1; they are attached at the micro level by entity overlap, or get
//! a singleton chain of their own, so no page is silently dropped.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

mod assemble;
mod merge;

pub use merge::jaccard;

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use assemble::{ProtoCore, ProtoSub};
use topicmap_core::config::AnalysisConfig;
use topicmap_core::error::Result;
use topicmap_core::types::{EntityRef, Page, PageId, TopicTree};
use topicmap_similarity::SimilarityMatrix;

/// Build and validate the topic tree for one corpus snapshot.
///
/// An empty corpus yields an empty tree. Structural violations (which
/// would make every downstream coverage number meaningless) abort with
/// `StructuralInvariant`.
pub fn build_tree(
    pages: &[Page],
    matrix: &SimilarityMatrix,
    config: &AnalysisConfig,
) -> Result<TopicTree> {
    if pages.is_empty() {
        return Ok(TopicTree::default());
    }
    let by_id: BTreeMap<&str, &Page> = pages.iter().map(|p| (p.page_id.as_str(), p)).collect();

    // Pass 1: core topics over the cosine matrix. Matrix ids are in
    // lexical order, so index-order tie-breaks are page-id tie-breaks.
    let core_partitions = merge::agglomerate(matrix.len(), |i, j| matrix.at(i, j), config.t_core);
    let core_groups: Vec<Vec<&Page>> = core_partitions
        .iter()
        .map(|cluster| {
            cluster.iter().map(|&i| by_id[matrix.ids()[i].as_str()]).collect()
        })
        .collect();

    // Pass 2: per-core subclustering is independent across disjoint
    // partitions; fan out and collect in partition order.
    let mut protos: Vec<ProtoCore> = core_groups
        .par_iter()
        .map(|members| subcluster(members, config))
        .collect();

    attach_excluded(&mut protos, matrix, &by_id);

    let mut tree = assemble::finalize(protos, &by_id);
    tree.excluded_pages = matrix.excluded().to_vec();

    let corpus: BTreeSet<PageId> = pages.iter().map(|p| p.page_id.clone()).collect();
    tree.validate(&corpus)?;
    tracing::info!(
        topics = tree.topics.len(),
        excluded = tree.excluded_pages.len(),
        "topic tree built"
    );
    Ok(tree)
}

/// Jaccard-agglomerate `members` at `t_sub`, then each result at `t_micro`.
fn subcluster(members: &[&Page], config: &AnalysisConfig) -> ProtoCore {
    let subs = entity_partitions(members, config.t_sub)
        .into_iter()
        .map(|sub_members| ProtoSub {
            micros: entity_partitions(&sub_members, config.t_micro)
                .into_iter()
                .map(|micro| micro.iter().map(|p| p.page_id.clone()).collect())
                .collect(),
        })
        .collect();
    ProtoCore { subs }
}

fn entity_partitions<'a>(members: &[&'a Page], threshold: f64) -> Vec<Vec<&'a Page>> {
    // Lexical page order keeps the merge tie-breaks deterministic.
    let mut sorted: Vec<&Page> = members.to_vec();
    sorted.sort_by(|a, b| a.page_id.cmp(&b.page_id));

    let partitions = merge::agglomerate(
        sorted.len(),
        |i, j| merge::jaccard(&sorted[i].entities, &sorted[j].entities),
        threshold,
    );
    partitions
        .into_iter()
        .map(|cluster| cluster.into_iter().map(|i| sorted[i]).collect())
        .collect()
}

/// Attach pages excluded from embedding clustering at the micro level.
///
/// Each excluded page joins the micro partition with the highest entity
/// overlap (ties to the lexically smallest partition); a page overlapping
/// nothing becomes its own core -> sub -> micro chain.
fn attach_excluded(
    protos: &mut Vec<ProtoCore>,
    matrix: &SimilarityMatrix,
    by_id: &BTreeMap<&str, &Page>,
) {
    for excluded in matrix.excluded() {
        let Some(page) = by_id.get(excluded.page_id.as_str()) else {
            continue;
        };
        let mut best: Option<(f64, PageId, usize, usize, usize)> = None;
        for (ci, core) in protos.iter().enumerate() {
            for (si, sub) in core.subs.iter().enumerate() {
                for (mi, micro) in sub.micros.iter().enumerate() {
                    let union = micro_entities(micro, by_id);
                    let overlap = merge::jaccard(&page.entities, &union);
                    if overlap <= 0.0 {
                        continue;
                    }
                    let anchor = micro.first().cloned().unwrap_or_default();
                    let better = match &best {
                        None => true,
                        Some((score, a, _, _, _)) => {
                            overlap > *score || (overlap == *score && anchor < *a)
                        }
                    };
                    if better {
                        best = Some((overlap, anchor, ci, si, mi));
                    }
                }
            }
        }
        match best {
            Some((_, _, ci, si, mi)) => {
                protos[ci].subs[si].micros[mi].insert(page.page_id.clone());
            }
            None => protos.push(ProtoCore::singleton(&page.page_id)),
        }
    }
}

fn micro_entities(
    micro: &BTreeSet<PageId>,
    by_id: &BTreeMap<&str, &Page>,
) -> BTreeSet<EntityRef> {
    let mut union = BTreeSet::new();
    for id in micro {
        if let Some(page) = by_id.get(id.as_str()) {
            union.extend(page.entities.iter().cloned());
        }
    }
    union
}
