//! Lexical similarity scoring.
//!
//! Bounded [0,1] similarity between two normalized strings under one of
//! three selectable algorithms. The token-set construction follows the
//! standard rapidfuzz formulation: compare sorted-intersection strings
//! against intersection-plus-difference strings and take the best ratio,
//! which makes the score robust to repeated or extra words.

use std::collections::BTreeSet;

use indicatif::ProgressBar;
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

use crate::core::cluster::SimilarityPair;
use crate::error::{QsiftError, Result};

/// Selectable lexical similarity algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyAlgorithm {
    /// Normalized edit-distance over raw character sequences
    Ratio,
    /// Sort whitespace tokens before comparing; word-order invariant
    TokenSortRatio,
    /// Compare token set intersection/difference strings
    TokenSetRatio,
}

impl std::str::FromStr for FuzzyAlgorithm {
    type Err = QsiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ratio" => Ok(Self::Ratio),
            "token_sort_ratio" => Ok(Self::TokenSortRatio),
            "token_set_ratio" => Ok(Self::TokenSetRatio),
            other => Err(QsiftError::config(format!(
                "unknown fuzzy algorithm '{other}' (expected ratio, token_sort_ratio, or token_set_ratio)"
            ))),
        }
    }
}

impl std::fmt::Display for FuzzyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ratio => "ratio",
            Self::TokenSortRatio => "token_sort_ratio",
            Self::TokenSetRatio => "token_set_ratio",
        };
        f.write_str(name)
    }
}

/// Compute lexical similarity between two strings, in [0,1]
pub fn lexical_similarity(a: &str, b: &str, algorithm: FuzzyAlgorithm) -> f64 {
    match algorithm {
        FuzzyAlgorithm::Ratio => ratio(a, b),
        FuzzyAlgorithm::TokenSortRatio => token_sort_ratio(a, b),
        FuzzyAlgorithm::TokenSetRatio => token_set_ratio(a, b),
    }
}

fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    normalized_levenshtein(a, b).clamp(0.0, 1.0)
}

fn sorted_join<S: Ord + std::fmt::Display>(tokens: impl IntoIterator<Item = S>) -> String {
    tokens.into_iter().sorted_unstable().join(" ")
}

fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_join(a.split_whitespace()), &sorted_join(b.split_whitespace()))
}

fn token_set_ratio(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }

    let intersection = sorted_join(set_a.intersection(&set_b));
    let diff_ab = sorted_join(set_a.difference(&set_b));
    let diff_ba = sorted_join(set_b.difference(&set_a));

    let combined_a = join_nonempty(&intersection, &diff_ab);
    let combined_b = join_nonempty(&intersection, &diff_ba);

    ratio(&intersection, &combined_a)
        .max(ratio(&intersection, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

/// Compute the symmetric n×n fuzzy similarity matrix, diagonal fixed at
/// 1.0. Entries below `threshold` are left at 0 as a performance
/// short-circuit only; the reported similarity is never lowered for
/// entries at or above it.
pub fn fuzzy_similarity_matrix(
    texts: &[String],
    algorithm: FuzzyAlgorithm,
    threshold: f64,
) -> Vec<Vec<f64>> {
    let n = texts.len();

    // Upper triangle in parallel, then mirror
    let upper: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut row = vec![0.0; n];
            row[i] = 1.0;
            for j in (i + 1)..n {
                let sim = lexical_similarity(&texts[i], &texts[j], algorithm);
                if sim >= threshold {
                    row[j] = sim;
                }
            }
            row
        })
        .collect();

    let mut matrix = upper;
    for i in 0..n {
        for j in (i + 1)..n {
            matrix[j][i] = matrix[i][j];
        }
    }
    matrix
}

/// Full O(n²) pairwise scan: every (i, j) with i < j and score at or
/// above `threshold` (inclusive boundary). Rows are scanned in parallel;
/// the collected pair order is deterministic.
pub fn find_fuzzy_pairs(
    texts: &[String],
    algorithm: FuzzyAlgorithm,
    threshold: f64,
    progress: &ProgressBar,
) -> Vec<SimilarityPair> {
    let n = texts.len();

    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            progress.inc(1);
            ((i + 1)..n).filter_map(move |j| {
                let sim = lexical_similarity(&texts[i], &texts[j], algorithm);
                (sim >= threshold).then(|| SimilarityPair::new(i, j, sim))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        for alg in [
            FuzzyAlgorithm::Ratio,
            FuzzyAlgorithm::TokenSortRatio,
            FuzzyAlgorithm::TokenSetRatio,
        ] {
            assert_eq!(lexical_similarity("wheat rust", "wheat rust", alg), 1.0);
        }
    }

    #[test]
    fn token_sort_is_word_order_invariant() {
        let a = "best fertilizer for wheat";
        let b = "wheat for best fertilizer";
        assert!(lexical_similarity(a, b, FuzzyAlgorithm::Ratio) < 1.0);
        assert_eq!(lexical_similarity(a, b, FuzzyAlgorithm::TokenSortRatio), 1.0);
    }

    #[test]
    fn token_set_tolerates_repeated_words() {
        let a = "wheat wheat fertilizer";
        let b = "wheat fertilizer";
        assert_eq!(lexical_similarity(a, b, FuzzyAlgorithm::TokenSetRatio), 1.0);
    }

    #[test]
    fn near_duplicates_score_high_under_token_sort() {
        let a = "what is best fertilizer for wheat";
        let b = "what is the best fertilizer for wheat";
        assert!(lexical_similarity(a, b, FuzzyAlgorithm::TokenSortRatio) >= 0.85);
    }

    #[test]
    fn unknown_algorithm_is_a_config_error() {
        let err = "levenshtein_banana".parse::<FuzzyAlgorithm>().unwrap_err();
        assert!(err.to_string().contains("unknown fuzzy algorithm"));
    }

    #[test]
    fn matrix_has_unit_diagonal_and_symmetry() {
        let texts = vec![
            "wheat fertilizer dose".to_string(),
            "wheat fertiliser dose".to_string(),
            "completely different topic entirely".to_string(),
        ];
        let m = fuzzy_similarity_matrix(&texts, FuzzyAlgorithm::Ratio, 0.0);
        for i in 0..3 {
            assert_eq!(m[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
        assert!(m[0][1] > 0.9);
    }

    #[test]
    fn matrix_threshold_zeroes_low_entries_only() {
        let texts = vec![
            "irrigation schedule".to_string(),
            "pesticide spray timing".to_string(),
        ];
        let m = fuzzy_similarity_matrix(&texts, FuzzyAlgorithm::Ratio, 0.9);
        assert_eq!(m[0][1], 0.0);
    }

    #[test]
    fn pair_scan_includes_threshold_boundary() {
        // ratio("ab", "ab") == 1.0; use a crafted threshold equal to an
        // achievable score to verify the inclusive boundary
        let texts = vec!["abcd".to_string(), "abcx".to_string()];
        let score = lexical_similarity("abcd", "abcx", FuzzyAlgorithm::Ratio);
        let pairs = find_fuzzy_pairs(
            &texts,
            FuzzyAlgorithm::Ratio,
            score,
            &ProgressBar::hidden(),
        );
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].a, pairs[0].b), (0, 1));

        let none = find_fuzzy_pairs(
            &texts,
            FuzzyAlgorithm::Ratio,
            score + 1e-9,
            &ProgressBar::hidden(),
        );
        assert!(none.is_empty());
    }
}
