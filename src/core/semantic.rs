//! Semantic similarity over embedding vectors.
//!
//! Cosine similarity, pairwise or as a full matrix, plus the
//! upper-triangle pair scan. Scores live in [-1,1]; for the normalized
//! text embeddings the pipeline feeds in, practically [0,1].

use rayon::prelude::*;

use crate::core::cluster::SimilarityPair;

/// Cosine similarity between two vectors; 0.0 when either has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Full n×n cosine similarity matrix, rows computed in parallel
pub fn cosine_matrix(embeddings: &[Vec<f32>]) -> Vec<Vec<f64>> {
    let n = embeddings.len();

    (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        1.0
                    } else {
                        cosine_similarity(&embeddings[i], &embeddings[j])
                    }
                })
                .collect()
        })
        .collect()
}

/// Upper-triangle scan for pairs with `score >= threshold` (inclusive),
/// sorted by score descending. The sort is stable, so ties keep their
/// original (i, j) order. Ordering is a reporting convenience only;
/// clustering does not depend on it.
pub fn find_similar_pairs(matrix: &[Vec<f64>], threshold: f64) -> Vec<SimilarityPair> {
    let n = matrix.len();
    let mut pairs = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            let sim = matrix[i][j];
            if sim >= threshold {
                pairs.push(SimilarityPair::new(i, j, sim));
            }
        }
    }

    pairs.sort_by(|x, y| y.score.partial_cmp(&x.score).unwrap_or(std::cmp::Ordering::Equal));
    pairs
}
