//! Greedy agglomerative merging with complete linkage.
//!
//! A merge is legal while the minimum pairwise similarity inside the
//! merged cluster stays at or above the threshold. Complete linkage makes
//! that check local: the merged minimum is the smaller of both clusters'
//! minima and the cross-cluster minimum, so clusters that each satisfy the
//! threshold only need the cross check.

use std::collections::BTreeSet;

/// Agglomerate `n` items under `sim`, returning clusters of item indices.
///
/// Deterministic: at every step the candidate pair with the highest
/// linkage wins; ties prefer the merge whose resulting cluster has the
/// smallest minimum item index, then the smaller partner index. Returned
/// clusters are sorted by their minimum member.
pub fn agglomerate<F>(n: usize, sim: F, threshold: f64) -> Vec<BTreeSet<usize>>
where
    F: Fn(usize, usize) -> f64,
{
    let mut clusters: Vec<BTreeSet<usize>> = (0..n).map(|i| BTreeSet::from([i])).collect();

    loop {
        let mut best: Option<(f64, usize, usize, usize, usize)> = None;
        for a in 0..clusters.len() {
            for b in (a + 1)..clusters.len() {
                let linkage = cross_linkage(&clusters[a], &clusters[b], &sim);
                if linkage < threshold {
                    continue;
                }
                let union_min = merged_min(&clusters[a], &clusters[b]);
                let other_min = merged_max_of_mins(&clusters[a], &clusters[b]);
                let better = match best {
                    None => true,
                    Some((l, u, o, _, _)) => {
                        linkage > l || (linkage == l && (union_min, other_min) < (u, o))
                    }
                };
                if better {
                    best = Some((linkage, union_min, other_min, a, b));
                }
            }
        }
        match best {
            Some((_, _, _, a, b)) => {
                let absorbed = clusters.remove(b);
                clusters[a].extend(absorbed);
            }
            None => break,
        }
    }

    clusters.sort_by_key(|c| c.first().copied());
    clusters
}

fn cross_linkage<F>(a: &BTreeSet<usize>, b: &BTreeSet<usize>, sim: &F) -> f64
where
    F: Fn(usize, usize) -> f64,
{
    let mut min = f64::INFINITY;
    for &i in a {
        for &j in b {
            let s = sim(i, j);
            if s < min {
                min = s;
            }
        }
    }
    min
}

fn merged_min(a: &BTreeSet<usize>, b: &BTreeSet<usize>) -> usize {
    a.first().copied().unwrap_or(usize::MAX).min(b.first().copied().unwrap_or(usize::MAX))
}

fn merged_max_of_mins(a: &BTreeSet<usize>, b: &BTreeSet<usize>) -> usize {
    a.first().copied().unwrap_or(usize::MAX).max(b.first().copied().unwrap_or(usize::MAX))
}

/// Jaccard similarity of two sets; 0 when both are empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    {
        a.intersection(b).count() as f64 / union as f64
    }
}
