//! Similarity engine: cosine similarity over precomputed page embeddings.
//!
//! Pure functions over immutable pages. The batched `SimilarityMatrix` is
//! computed once per clustering pass; callers never recompute embeddings.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

use rayon::prelude::*;
use std::collections::BTreeMap;

use topicmap_core::error::{Error, Result};
use topicmap_core::types::{ExcludedPage, Page, PageId};

/// Cosine similarity of two embedding vectors, accumulated in f64.
///
/// Exactly commutative: swapping `a` and `b` pairs the same elements in
/// the same order, so the float operations are identical.
fn cosine_vec(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    dot / (na.sqrt() * nb.sqrt())
}

fn embedding_of(page: &Page) -> Result<&[f32]> {
    let v = page
        .embedding
        .as_deref()
        .ok_or_else(|| Error::IncompleteData(format!("page {} has no embedding", page.page_id)))?;
    if v.iter().all(|x| *x == 0.0) {
        return Err(Error::IncompleteData(format!(
            "page {} has a zero-magnitude embedding",
            page.page_id
        )));
    }
    Ok(v)
}

/// Cosine similarity of two pages, in [-1, 1].
///
/// Fails with `IncompleteData` when either embedding is absent, malformed
/// (zero magnitude) or the dimensions disagree.
pub fn similarity(a: &Page, b: &Page) -> Result<f64> {
    let va = embedding_of(a)?;
    let vb = embedding_of(b)?;
    if va.len() != vb.len() {
        return Err(Error::IncompleteData(format!(
            "embedding dimension mismatch: page {} has {}, page {} has {}",
            a.page_id,
            va.len(),
            b.page_id,
            vb.len()
        )));
    }
    Ok(cosine_vec(va, vb))
}

/// Full pairwise similarity matrix over the embeddable subset of a corpus.
///
/// Pages with an absent, zero-magnitude or wrong-dimension embedding are
/// not an error here: they are left out of the matrix and recorded so the
/// clustering engine can attach them by entity-overlap fallback and the
/// coverage computer can surface the exclusion as evidence.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    ids: Vec<PageId>,
    index: BTreeMap<PageId, usize>,
    values: Vec<f64>,
    excluded: Vec<ExcludedPage>,
}

impl SimilarityMatrix {
    pub fn build(pages: &[Page]) -> Self {
        let mut ids = Vec::new();
        let mut vectors: Vec<&[f32]> = Vec::new();
        let mut excluded = Vec::new();
        let mut dim: Option<usize> = None;

        // Deterministic id order regardless of input order.
        let mut sorted: Vec<&Page> = pages.iter().collect();
        sorted.sort_by(|a, b| a.page_id.cmp(&b.page_id));

        for page in sorted {
            match embedding_of(page) {
                Ok(v) => {
                    let d = *dim.get_or_insert(v.len());
                    if v.len() != d {
                        excluded.push(ExcludedPage {
                            page_id: page.page_id.clone(),
                            reason: format!("embedding dimension {} != corpus dimension {d}", v.len()),
                        });
                        continue;
                    }
                    ids.push(page.page_id.clone());
                    vectors.push(v);
                }
                Err(e) => excluded.push(ExcludedPage {
                    page_id: page.page_id.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        let n = ids.len();
        let vectors = &vectors;
        let values: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                let vi = vectors[i];
                (0..n).map(move |j| cosine_vec(vi, vectors[j]))
            })
            .collect();

        let index = ids.iter().cloned().enumerate().map(|(i, id)| (id, i)).collect();
        tracing::debug!(pages = n, excluded = excluded.len(), "similarity matrix built");
        Self { ids, index, values, excluded }
    }

    /// Page ids covered by the matrix, in lexical order.
    pub fn ids(&self) -> &[PageId] {
        &self.ids
    }

    pub fn excluded(&self) -> &[ExcludedPage] {
        &self.excluded
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Similarity by page id; `None` when either page is not in the matrix.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = *self.index.get(a)?;
        let j = *self.index.get(b)?;
        Some(self.values[i * self.ids.len() + j])
    }

    /// Similarity by dense index, for callers iterating the matrix.
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.ids.len() + j]
    }
}
