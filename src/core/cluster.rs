//! Pair clustering via Union-Find, plus representative selection.
//!
//! Similarity pairs at or above a stage threshold are unioned into
//! equivalence classes. Membership is transitive: A~B and B~C place A and
//! C in one cluster even when sim(A, C) is below threshold. This chaining
//! effect is accepted behavior and covered by tests; operators should be
//! aware of it when choosing thresholds.

use std::collections::HashSet;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{QsiftError, Result};

/// A scored, order-normalized index pair (`a < b`, score in [0,1])
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityPair {
    pub a: usize,
    pub b: usize,
    pub score: f64,
}

impl SimilarityPair {
    /// Build a pair with the index-order invariant enforced
    pub fn new(i: usize, j: usize, score: f64) -> Self {
        if i <= j {
            Self { a: i, b: j, score }
        } else {
            Self { a: j, b: i, score }
        }
    }
}

/// Disjoint Set Union over `n` elements with path compression and
/// union by rank; amortized near-O(1) per operation.
#[derive(Debug)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// Every element starts as its own singleton cluster
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Find the root of `x`, flattening the parent chain as we go.
    /// Iterative so 100k+ element chains cannot overflow the stack.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        // Second pass: point the whole chain at the root
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }

        root
    }

    /// Merge the sets containing `x` and `y` (attach shallower root under
    /// deeper; on rank tie, pick one root and bump its rank)
    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x == root_y {
            return;
        }

        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }

    /// Group all elements by their current root. Cluster ids are root
    /// indices: unique within a run, no meaning beyond that. Member lists
    /// are in ascending index order and the clusters partition `0..n`,
    /// singletons included.
    pub fn clusters(&mut self) -> IndexMap<usize, Vec<usize>> {
        let mut clusters: IndexMap<usize, Vec<usize>> = IndexMap::new();
        for i in 0..self.parent.len() {
            let root = self.find(i);
            clusters.entry(root).or_default().push(i);
        }
        clusters
    }
}

/// Cluster `n` items from a list of above-threshold similarity pairs
pub fn cluster_by_pairs(n: usize, pairs: &[SimilarityPair]) -> IndexMap<usize, Vec<usize>> {
    let mut uf = UnionFind::new(n);
    for pair in pairs {
        uf.union(pair.a, pair.b);
    }

    let clusters = uf.clusters();
    tracing::debug!(clusters = clusters.len(), items = n, "clustered pairs");
    clusters
}

/// Policy for choosing the surviving member of each cluster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Lowest original index; stable and deterministic (Stage-2 default)
    First,
    /// Highest externally supplied score; ties go to the first max-scorer
    /// (Stage-3 default, with text length as the score)
    Best,
    /// Uniformly random member under an explicit seed. Deterministic for a
    /// fixed seed, but any seed change reshuffles choices; avoid in
    /// pipelines that must be reproducible across configurations.
    Random { seed: u64 },
}

/// Choose one representative per cluster. `scores` is required by
/// [`SelectionStrategy::Best`]; supplying it with other strategies is
/// harmless. The chosen index is always a member of its cluster.
pub fn select_representatives(
    clusters: &IndexMap<usize, Vec<usize>>,
    scores: Option<&[f64]>,
    strategy: SelectionStrategy,
) -> Result<IndexMap<usize, usize>> {
    if matches!(strategy, SelectionStrategy::Best) && scores.is_none() {
        return Err(QsiftError::config(
            "representative strategy 'best' requires per-item scores",
        ));
    }

    let mut rng = match strategy {
        SelectionStrategy::Random { seed } => Some(StdRng::seed_from_u64(seed)),
        _ => None,
    };

    let mut representatives = IndexMap::with_capacity(clusters.len());

    for (&cluster_id, members) in clusters {
        debug_assert!(!members.is_empty(), "clusters never have zero members");

        let chosen = match strategy {
            SelectionStrategy::First => members[0],
            SelectionStrategy::Best => {
                let scores = scores.unwrap_or_default();
                let mut best = members[0];
                for &m in &members[1..] {
                    if scores.get(m) > scores.get(best) {
                        best = m;
                    }
                }
                best
            }
            SelectionStrategy::Random { .. } => match rng.as_mut() {
                Some(rng) => *members.choose(rng).unwrap_or(&members[0]),
                None => members[0],
            },
        };

        representatives.insert(cluster_id, chosen);
    }

    Ok(representatives)
}

/// Indices slated for removal: every cluster member that is not its
/// cluster's representative
pub fn removal_set(
    clusters: &IndexMap<usize, Vec<usize>>,
    representatives: &IndexMap<usize, usize>,
) -> HashSet<usize> {
    let mut removed = HashSet::new();
    for (cluster_id, members) in clusters {
        let rep = representatives[cluster_id];
        removed.extend(members.iter().copied().filter(|&m| m != rep));
    }
    removed
}
