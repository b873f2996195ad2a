//! Candidate pair sampling for sub-quadratic fuzzy matching.
//!
//! Near-duplicate questions rarely differ by more than ~20% in length, so
//! bucketing by length is a cheap, high-recall prefilter: each record is
//! compared only against records in its own bucket and the two buckets to
//! either side (±20 characters at bucket width 10). A global comparison
//! budget bounds worst-case runtime on datasets the full O(n²) scan would
//! never finish; once the budget is spent the scan stops even if some
//! records were not fully explored.

use std::collections::HashMap;

use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

use crate::core::cluster::SimilarityPair;
use crate::core::lexical::{lexical_similarity, FuzzyAlgorithm};

/// Bucket width in characters
const BUCKET_WIDTH: usize = 10;

/// Neighboring buckets searched on each side
const BUCKET_SPREAD: usize = 2;

/// Hard cap on candidates per record, before the budget-derived cap
const MAX_PER_QUESTION: usize = 100;

/// Whether the sampled path should engage for `n` texts under the given
/// budget: only when the full pairwise count exceeds it
pub fn should_sample(n: usize, max_comparisons: usize) -> bool {
    n * n.saturating_sub(1) / 2 > max_comparisons
}

/// Sampled pairwise scan under a global comparison budget.
///
/// For record `i`, candidate partners come from length buckets
/// `bucket(i) ± 2`, restricted to `j > i` so no pair is evaluated twice.
/// Oversized candidate sets are uniformly subsampled without replacement
/// using the explicit `seed`, keeping sampled runs reproducible.
pub fn sampled_fuzzy_pairs(
    texts: &[String],
    algorithm: FuzzyAlgorithm,
    threshold: f64,
    max_comparisons: usize,
    seed: u64,
    progress: &ProgressBar,
) -> Vec<SimilarityPair> {
    let n = texts.len();
    if n < 2 {
        return Vec::new();
    }

    let mut buckets: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, text) in texts.iter().enumerate() {
        buckets.entry(text.chars().count() / BUCKET_WIDTH).or_default().push(i);
    }

    let max_per_question = MAX_PER_QUESTION.min(max_comparisons / n);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pairs = Vec::new();
    let mut comparisons_made = 0usize;

    'outer: for i in 0..n {
        progress.inc(1);

        let bucket = texts[i].chars().count() / BUCKET_WIDTH;
        let lo = bucket.saturating_sub(BUCKET_SPREAD);
        let hi = bucket + BUCKET_SPREAD;

        let mut candidates: Vec<usize> = (lo..=hi)
            .filter_map(|b| buckets.get(&b))
            .flatten()
            .copied()
            .filter(|&j| j > i)
            .collect();

        if candidates.len() > max_per_question {
            let picked = sample(&mut rng, candidates.len(), max_per_question);
            candidates = picked.iter().map(|k| candidates[k]).collect();
        }

        for j in candidates {
            if comparisons_made >= max_comparisons {
                tracing::info!(max_comparisons, "comparison budget exhausted, stopping scan");
                break 'outer;
            }

            let sim = lexical_similarity(&texts[i], &texts[j], algorithm);
            if sim >= threshold {
                pairs.push(SimilarityPair::new(i, j, sim));
            }
            comparisons_made += 1;
        }
    }

    tracing::info!(
        comparisons = comparisons_made,
        full = n * (n - 1) / 2,
        pairs = pairs.len(),
        "sampled fuzzy scan complete"
    );

    pairs
}
