//! Deduplication orchestrator.
//!
//! Runs the three stages strictly in sequence (exact → fuzzy → semantic)
//! over a monotonically shrinking working set: a later stage only sees
//! records that survived all earlier stages, and a record removed in
//! Stage 2 is never revisited in Stage 3. All configuration and
//! capability problems surface before any stage does work; a failure
//! mid-stage aborts the whole run with no partial removal applied.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use indicatif::ProgressBar;
use tracing::info;

use crate::core::cluster::{
    cluster_by_pairs, removal_set, select_representatives, SelectionStrategy, SimilarityPair,
};
use crate::core::embed::Embedder;
use crate::core::lexical::find_fuzzy_pairs;
use crate::core::normalize::{clean_question, is_valid_question, normalize};
use crate::core::report::{DeduplicationReport, DuplicateGroup, MatchKind};
use crate::core::sampler::{sampled_fuzzy_pairs, should_sample};
use crate::core::semantic::{cosine_matrix, find_similar_pairs};
use crate::error::{QsiftError, Result};
use crate::infra::config::PipelineConfig;

/// One input item: the designated question text plus pass-through fields.
/// The pipeline never mutates a record; it only decides keep/drop. A
/// record's identity is its position in the input sequence.
#[derive(Debug, Clone)]
pub struct Record {
    /// Designated text field (the "question")
    pub text: String,
    /// Full source row, passed through unchanged
    pub fields: Vec<String>,
}

impl Record {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fields: Vec::new(),
        }
    }
}

/// Per-record verdict, indexed by original input position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Survived every enabled stage
    Kept,
    /// Failed the validity filter before Stage 1 (counted, not an error)
    SkippedInvalid,
    /// Removed as a duplicate of the record at original index `of`
    Duplicate {
        of: usize,
        similarity: f64,
        kind: MatchKind,
    },
}

/// Everything a run produces, handed to an external writer
#[derive(Debug)]
pub struct RunOutput {
    /// Surviving records, order-preserving relative to the input
    pub kept: Vec<Record>,
    /// One outcome per original input record
    pub outcomes: Vec<Outcome>,
    pub report: DeduplicationReport,
}

/// Three-stage deduplication pipeline over a record set.
///
/// The embedding capability is injected, never constructed here: two
/// independent runs in one process share no model state unless the
/// caller pools an [`Embedder`] deliberately. One `Deduplicator` drives
/// one run.
pub struct Deduplicator {
    config: PipelineConfig,
    embedder: Option<Box<dyn Embedder>>,
    show_progress: bool,
}

impl Deduplicator {
    pub fn new(config: PipelineConfig, embedder: Option<Box<dyn Embedder>>) -> Self {
        Self {
            config,
            embedder,
            show_progress: false,
        }
    }

    /// Enable comparison progress bars (CLI use)
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run the full pipeline. Consumes the deduplicator: the report
    /// lifecycle is one run.
    pub fn run(self, records: Vec<Record>) -> Result<RunOutput> {
        // Fail-fast validation, before any stage work
        self.config.validate()?;
        if self.config.semantic.enabled && self.embedder.is_none() {
            return Err(QsiftError::DependencyUnavailable(
                "semantic stage is enabled but no embedding backend was provided \
                 (build with the `fastembed` feature or inject an Embedder)"
                    .to_string(),
            ));
        }

        let mut report = DeduplicationReport::new(self.config.report.max_group_samples);
        report.start_timer();
        report.original_count = records.len();

        let mut outcomes = vec![Outcome::Kept; records.len()];

        // Validity filter: not a stage and not an error, just a counted skip
        let mut working: Vec<(usize, Record)> = Vec::with_capacity(records.len());
        for (idx, record) in records.into_iter().enumerate() {
            if is_valid_question(
                &record.text,
                self.config.input.min_length,
                self.config.input.max_length,
            ) {
                working.push((idx, record));
            } else {
                outcomes[idx] = Outcome::SkippedInvalid;
                report.skipped_invalid += 1;
            }
        }
        info!(
            valid = working.len(),
            skipped = report.skipped_invalid,
            "validity filter applied"
        );

        if working.is_empty() {
            // Zero valid records is an empty output, not a fault
            report.finalize(0);
            return Ok(RunOutput {
                kept: Vec::new(),
                outcomes,
                report,
            });
        }

        if self.config.exact.enabled {
            let removed = self.remove_exact(&mut working, &mut outcomes, &mut report);
            report.exact_removed = removed;
            info!(removed, remaining = working.len(), "stage 1 (exact) done");
        } else {
            info!("stage 1 (exact) disabled, skipping");
        }

        if self.config.fuzzy.enabled {
            let removed = self.remove_fuzzy(&mut working, &mut outcomes, &mut report)?;
            report.fuzzy_removed = removed;
            info!(removed, remaining = working.len(), "stage 2 (fuzzy) done");
        } else {
            info!("stage 2 (fuzzy) disabled, skipping");
        }

        if self.config.semantic.enabled {
            let removed = self.remove_semantic(&mut working, &mut outcomes, &mut report)?;
            report.semantic_removed = removed;
            info!(removed, remaining = working.len(), "stage 3 (semantic) done");
        } else {
            info!("stage 3 (semantic) disabled, skipping");
        }

        report.finalize(working.len());

        Ok(RunOutput {
            kept: working.into_iter().map(|(_, r)| r).collect(),
            outcomes,
            report,
        })
    }

    /// Stage 1: drop records whose normalized text equals an earlier
    /// record's, keeping the first occurrence
    fn remove_exact(
        &self,
        working: &mut Vec<(usize, Record)>,
        outcomes: &mut [Outcome],
        report: &mut DeduplicationReport,
    ) -> usize {
        let before = working.len();
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut rep_texts: HashMap<usize, String> = HashMap::new();
        let mut groups: IndexMap<usize, Vec<String>> = IndexMap::new();

        working.retain(|(orig, record)| {
            let key = normalize(&record.text, &self.config.normalize);
            match first_seen.get(&key) {
                Some(&first_orig) => {
                    outcomes[*orig] = Outcome::Duplicate {
                        of: first_orig,
                        similarity: 1.0,
                        kind: MatchKind::Exact,
                    };
                    groups.entry(first_orig).or_default().push(record.text.clone());
                    false
                }
                None => {
                    first_seen.insert(key, *orig);
                    rep_texts.insert(*orig, record.text.clone());
                    true
                }
            }
        });

        // Group order follows first occurrence in the input
        for (first_orig, duplicates) in groups {
            if let Some(rep_text) = rep_texts.remove(&first_orig) {
                report.add_duplicate_group(DuplicateGroup {
                    representative: rep_text,
                    duplicates,
                    kind: MatchKind::Exact,
                    similarity: 1.0,
                });
            }
        }

        before - working.len()
    }

    /// Stage 2: lexical near-duplicate removal, sampled when the full
    /// pairwise count exceeds the comparison budget
    fn remove_fuzzy(
        &self,
        working: &mut Vec<(usize, Record)>,
        outcomes: &mut [Outcome],
        report: &mut DeduplicationReport,
    ) -> Result<usize> {
        let cfg = &self.config.fuzzy;
        let texts: Vec<String> = working.iter().map(|(_, r)| clean_question(&r.text)).collect();
        let n = texts.len();

        let progress = self.progress_bar(n);
        let pairs = if cfg.use_sampling && should_sample(n, cfg.max_comparisons) {
            info!(
                n,
                full = n * n.saturating_sub(1) / 2,
                budget = cfg.max_comparisons,
                "large input, using sampled fuzzy scan"
            );
            sampled_fuzzy_pairs(
                &texts,
                cfg.algorithm,
                cfg.threshold,
                cfg.max_comparisons,
                cfg.sample_seed,
                &progress,
            )
        } else {
            find_fuzzy_pairs(&texts, cfg.algorithm, cfg.threshold, &progress)
        };
        progress.finish_and_clear();
        info!(pairs = pairs.len(), threshold = cfg.threshold, "fuzzy pairs found");

        apply_clustering(
            working,
            &texts,
            &pairs,
            cfg.strategy,
            MatchKind::Fuzzy,
            outcomes,
            report,
        )
    }

    /// Stage 3: embedding-based semantic duplicate removal. Any encoding
    /// failure fails the whole stage; a silently skipped record would
    /// corrupt cluster membership for its true duplicates.
    fn remove_semantic(
        &self,
        working: &mut Vec<(usize, Record)>,
        outcomes: &mut [Outcome],
        report: &mut DeduplicationReport,
    ) -> Result<usize> {
        let cfg = &self.config.semantic;
        let embedder = self
            .embedder
            .as_ref()
            .ok_or_else(|| {
                QsiftError::DependencyUnavailable("no embedding backend".to_string())
            })?;

        let texts: Vec<String> = working.iter().map(|(_, r)| clean_question(&r.text)).collect();

        info!(model = embedder.model_id(), n = texts.len(), "encoding questions");
        let embeddings = embedder.encode(&texts)?;

        let matrix = cosine_matrix(&embeddings);
        let pairs = find_similar_pairs(&matrix, cfg.similarity_threshold);
        info!(
            pairs = pairs.len(),
            threshold = cfg.similarity_threshold,
            "semantic pairs found"
        );

        apply_clustering(
            working,
            &texts,
            &pairs,
            cfg.strategy,
            MatchKind::Semantic,
            outcomes,
            report,
        )
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if self.show_progress {
            ProgressBar::new(len as u64)
        } else {
            ProgressBar::hidden()
        }
    }
}

/// Shared clustering tail for Stages 2 and 3: cluster the pairs, pick
/// representatives, record audit groups, and shrink the working set.
/// Returns the number of records removed.
fn apply_clustering(
    working: &mut Vec<(usize, Record)>,
    texts: &[String],
    pairs: &[SimilarityPair],
    strategy: SelectionStrategy,
    kind: MatchKind,
    outcomes: &mut [Outcome],
    report: &mut DeduplicationReport,
) -> Result<usize> {
    if pairs.is_empty() {
        return Ok(0);
    }

    let clusters = cluster_by_pairs(working.len(), pairs);

    // Length scores are always available so the Best strategy can prefer
    // longer, more complete questions in either stage
    let scores: Vec<f64> = texts.iter().map(|t| t.chars().count() as f64).collect();
    let representatives = select_representatives(&clusters, Some(&scores), strategy)?;

    // Strongest observed similarity per member, for the outcome map
    let mut best_score: HashMap<usize, f64> = HashMap::new();
    for pair in pairs {
        for idx in [pair.a, pair.b] {
            let entry = best_score.entry(idx).or_insert(pair.score);
            if pair.score > *entry {
                *entry = pair.score;
            }
        }
    }

    for (cluster_id, members) in &clusters {
        if members.len() < 2 {
            continue;
        }
        let rep = representatives[cluster_id];
        let similarity = members
            .iter()
            .filter(|&&m| m != rep)
            .filter_map(|m| best_score.get(m))
            .fold(0.0f64, |acc, &s| acc.max(s));
        report.add_duplicate_group(DuplicateGroup {
            representative: working[rep].1.text.clone(),
            duplicates: members
                .iter()
                .filter(|&&m| m != rep)
                .map(|&m| working[m].1.text.clone())
                .collect(),
            kind,
            similarity,
        });
    }

    let to_remove: HashSet<usize> = removal_set(&clusters, &representatives);

    // Map each removed member to its representative's original index
    let mut rep_of: HashMap<usize, usize> = HashMap::new();
    for (cluster_id, members) in &clusters {
        let rep = representatives[cluster_id];
        for &m in members {
            if m != rep {
                rep_of.insert(m, working[rep].0);
            }
        }
    }

    for (&member, &rep_orig) in &rep_of {
        let (orig, _) = working[member];
        outcomes[orig] = Outcome::Duplicate {
            of: rep_orig,
            similarity: best_score.get(&member).copied().unwrap_or(0.0),
            kind,
        };
    }

    let before = working.len();
    let mut local = 0usize;
    working.retain(|_| {
        let keep = !to_remove.contains(&local);
        local += 1;
        keep
    });

    Ok(before - working.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    /// Deterministic test embedder: fixed vocabulary, one axis per topic
    /// word, so semantically equivalent phrasings share an axis
    struct TopicEmbedder {
        topics: Vec<Vec<&'static str>>,
    }

    impl TopicEmbedder {
        fn agri() -> Self {
            Self {
                topics: vec![
                    vec!["fertilizer", "fertiliser", "khad"],
                    vec!["water", "irrigation"],
                    vec!["wheat"],
                    vec!["corn", "maize"],
                ],
            }
        }
    }

    impl Embedder for TopicEmbedder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    self.topics
                        .iter()
                        .map(|words| {
                            let hit = words.iter().any(|w| t.contains(w));
                            if hit { 1.0 } else { 0.0 }
                        })
                        .collect()
                })
                .collect())
        }

        fn model_id(&self) -> &str {
            "topic-test-embedder"
        }
    }

    fn record(text: &str) -> Record {
        Record::new(text)
    }

    fn base_config() -> PipelineConfig {
        let mut cfg = PipelineConfig::default();
        cfg.input.min_length = 5;
        cfg
    }

    #[test]
    fn exact_duplicates_removed_first_occurrence_kept() {
        let mut cfg = base_config();
        cfg.fuzzy.enabled = false;

        let records = vec![
            record("What is the best fertilizer for wheat?"),
            record("What is the best fertilizer for wheat?"),
            record("How much water does corn need?"),
        ];

        let out = Deduplicator::new(cfg, None).run(records).unwrap();
        assert_eq!(out.kept.len(), 2);
        assert_eq!(out.report.exact_removed, 1);
        assert_eq!(out.kept[0].text, "What is the best fertilizer for wheat?");
        assert!(matches!(
            out.outcomes[1],
            Outcome::Duplicate {
                of: 0,
                kind: MatchKind::Exact,
                ..
            }
        ));
    }

    #[test]
    fn exact_stage_is_case_and_whitespace_insensitive() {
        let mut cfg = base_config();
        cfg.fuzzy.enabled = false;

        let records = vec![
            record("What is the best fertilizer for wheat?"),
            record("  what is THE best   fertilizer for wheat?"),
        ];

        let out = Deduplicator::new(cfg, None).run(records).unwrap();
        assert_eq!(out.kept.len(), 1);
    }

    #[test]
    fn fuzzy_stage_merges_near_duplicates_first_seen_wins() {
        let mut cfg = base_config();
        cfg.fuzzy.threshold = 0.85;

        let records = vec![
            record("What is best fertilizer for wheat"),
            record("What is the best fertilizer for wheat?"),
        ];

        let out = Deduplicator::new(cfg, None).run(records).unwrap();
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.report.fuzzy_removed, 1);
        assert_eq!(out.kept[0].text, "What is best fertilizer for wheat");
        match out.outcomes[1] {
            Outcome::Duplicate {
                of,
                similarity,
                kind,
            } => {
                assert_eq!(of, 0);
                assert_eq!(kind, MatchKind::Fuzzy);
                assert!(similarity >= 0.85);
            }
            other => panic!("expected fuzzy duplicate, got {other:?}"),
        }
    }

    #[test]
    fn semantic_stage_catches_what_fuzzy_missed() {
        let mut cfg = base_config();
        cfg.semantic.enabled = true;

        // Lexically dissimilar, semantically equivalent
        let records = vec![
            record("Which khad is best for wheat crop?"),
            record("What is the best fertilizer for wheat?"),
        ];

        // Fuzzy alone must not merge these
        let fuzzy_out = Deduplicator::new(base_config(), None)
            .run(records.clone())
            .unwrap();
        assert_eq!(fuzzy_out.kept.len(), 2);

        // Semantic stage merges them; Best keeps the longer question
        let out = Deduplicator::new(cfg, Some(Box::new(TopicEmbedder::agri())))
            .run(records)
            .unwrap();
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.report.semantic_removed, 1);
        assert!(matches!(
            out.outcomes[0],
            Outcome::Duplicate {
                kind: MatchKind::Semantic,
                ..
            }
        ));
    }

    #[test]
    fn semantic_enabled_without_embedder_fails_before_any_stage() {
        let mut cfg = base_config();
        cfg.semantic.enabled = true;

        let err = Deduplicator::new(cfg, None)
            .run(vec![record("How much water does corn need?")])
            .unwrap_err();
        assert!(matches!(err, QsiftError::DependencyUnavailable(_)));
    }

    #[test]
    fn disabled_stages_leave_working_set_unchanged() {
        let mut cfg = base_config();
        cfg.exact.enabled = false;
        cfg.fuzzy.enabled = false;

        let records = vec![
            record("What is the best fertilizer for wheat?"),
            record("What is the best fertilizer for wheat?"),
        ];

        let out = Deduplicator::new(cfg, None).run(records).unwrap();
        assert_eq!(out.kept.len(), 2);
        assert_eq!(out.report.total_removed, 0);
    }

    #[test]
    fn monotonic_shrink_across_stages() {
        let cfg = base_config();
        let records = vec![
            record("What is the best fertilizer for wheat?"),
            record("what is the best fertilizer for wheat?"),
            record("What is best fertilizer for wheat"),
            record("How much water does corn need?"),
        ];
        let original = records.len();

        let out = Deduplicator::new(cfg, None).run(records).unwrap();
        assert!(out.kept.len() <= original);
        assert_eq!(
            out.report.final_count + out.report.total_removed + out.report.skipped_invalid,
            original
        );
    }

    #[test]
    fn invalid_records_are_skipped_not_errors() {
        let cfg = base_config();
        let records = vec![
            record("ok?"), // too short
            record("How much water does corn need?"),
            record(""),
        ];

        let out = Deduplicator::new(cfg, None).run(records).unwrap();
        assert_eq!(out.report.skipped_invalid, 2);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.outcomes[0], Outcome::SkippedInvalid);
        assert_eq!(out.outcomes[2], Outcome::SkippedInvalid);
    }

    #[test]
    fn all_invalid_input_yields_empty_output_not_error() {
        let cfg = base_config();
        let out = Deduplicator::new(cfg, None)
            .run(vec![record("a"), record("b")])
            .unwrap();
        assert!(out.kept.is_empty());
        assert_eq!(out.report.final_count, 0);
        assert_eq!(out.report.total_removed, 0);
        assert_eq!(out.report.skipped_invalid, 2);
    }

    #[test]
    fn empty_input_yields_empty_output_not_error() {
        let out = Deduplicator::new(base_config(), None).run(Vec::new()).unwrap();
        assert!(out.kept.is_empty());
        assert_eq!(out.report.original_count, 0);
        assert_eq!(out.report.final_count, 0);
    }

    #[test]
    fn invalid_config_fails_before_processing() {
        let mut cfg = base_config();
        cfg.fuzzy.threshold = 2.0;
        let err = Deduplicator::new(cfg, None)
            .run(vec![record("How much water does corn need?")])
            .unwrap_err();
        assert!(matches!(err, QsiftError::Config(_)));
    }

    #[test]
    fn pass_through_fields_survive_untouched() {
        let cfg = base_config();
        let mut r = record("How much water does corn need?");
        r.fields = vec!["42".to_string(), "Punjab".to_string()];

        let out = Deduplicator::new(cfg, None).run(vec![r]).unwrap();
        assert_eq!(out.kept[0].fields, vec!["42", "Punjab"]);
    }
}
