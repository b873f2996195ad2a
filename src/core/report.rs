//! Run statistics and audit samples for a deduplication run.
//!
//! One report per pipeline run: created at the start, mutated by each
//! stage, finalized once (timer stopped, reduction computed) at the end.
//! Duplicate-group samples are capped so reports stay readable on
//! hundred-thousand-row inputs.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default cap on recorded duplicate-group samples
pub const DEFAULT_MAX_GROUP_SAMPLES: usize = 20;

/// Which stage matched a pair of duplicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Fuzzy,
    Semantic,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::Fuzzy => f.write_str("fuzzy"),
            Self::Semantic => f.write_str("semantic"),
        }
    }
}

/// Audit sample: one representative plus the duplicates removed for it
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    /// Text of the record that was kept
    pub representative: String,
    /// Texts of the removed cluster members
    pub duplicates: Vec<String>,
    /// Which stage produced the group
    pub kind: MatchKind,
    /// Similarity associated with the group
    pub similarity: f64,
}

/// Accumulated statistics for one pipeline run
#[derive(Debug, Serialize)]
pub struct DeduplicationReport {
    pub original_count: usize,
    /// Records dropped by the validity filter before Stage 1 (expected
    /// behavior, counted separately from duplicate removal)
    pub skipped_invalid: usize,
    pub exact_removed: usize,
    pub fuzzy_removed: usize,
    pub semantic_removed: usize,
    pub final_count: usize,
    pub total_removed: usize,
    pub reduction_percentage: f64,
    pub processing_secs: f64,
    pub generated_at: DateTime<Utc>,
    pub duplicate_groups: Vec<DuplicateGroup>,

    #[serde(skip)]
    max_group_samples: usize,
    #[serde(skip)]
    started: Option<Instant>,
}

impl Default for DeduplicationReport {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_GROUP_SAMPLES)
    }
}

impl DeduplicationReport {
    pub fn new(max_group_samples: usize) -> Self {
        Self {
            original_count: 0,
            skipped_invalid: 0,
            exact_removed: 0,
            fuzzy_removed: 0,
            semantic_removed: 0,
            final_count: 0,
            total_removed: 0,
            reduction_percentage: 0.0,
            processing_secs: 0.0,
            generated_at: Utc::now(),
            duplicate_groups: Vec::new(),
            max_group_samples,
            started: None,
        }
    }

    pub fn start_timer(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Record a duplicate group sample; silently ignored past the cap
    pub fn add_duplicate_group(&mut self, group: DuplicateGroup) {
        if self.duplicate_groups.len() < self.max_group_samples {
            self.duplicate_groups.push(group);
        }
    }

    /// Stop the timer and derive the summary totals
    pub fn finalize(&mut self, final_count: usize) {
        self.final_count = final_count;
        self.total_removed = self.exact_removed + self.fuzzy_removed + self.semantic_removed;
        if self.original_count > 0 {
            self.reduction_percentage =
                self.total_removed as f64 / self.original_count as f64 * 100.0;
        }
        if let Some(started) = self.started.take() {
            self.processing_secs = started.elapsed().as_secs_f64();
        }
        self.generated_at = Utc::now();
    }

    /// Render the plain-text summary handed to operators
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(70);
        let thin = "-".repeat(70);

        out.push_str(&rule);
        out.push_str("\nDEDUPLICATION REPORT\n");
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!("Original count:              {}\n", self.original_count));
        out.push_str(&format!("Invalid records skipped:     {}\n", self.skipped_invalid));
        out.push_str(&format!("Exact duplicates removed:    {}\n", self.exact_removed));
        out.push_str(&format!("Fuzzy duplicates removed:    {}\n", self.fuzzy_removed));
        out.push_str(&format!("Semantic duplicates removed: {}\n", self.semantic_removed));
        out.push_str(&thin);
        out.push('\n');
        out.push_str(&format!("Total removed:               {}\n", self.total_removed));
        out.push_str(&format!("Final count:                 {}\n", self.final_count));
        out.push_str(&format!("Reduction:                   {:.2}%\n", self.reduction_percentage));
        out.push_str(&format!("Processing time:             {:.2}s\n", self.processing_secs));
        out.push_str(&rule);
        out.push('\n');

        if !self.duplicate_groups.is_empty() {
            out.push_str(&format!(
                "\nSAMPLE DUPLICATE GROUPS (first {})\n",
                self.duplicate_groups.len()
            ));
            out.push_str(&thin);
            out.push('\n');
            for (i, group) in self.duplicate_groups.iter().enumerate() {
                out.push_str(&format!(
                    "\nGroup {} [{}] (similarity: {:.3}):\n",
                    i + 1,
                    group.kind,
                    group.similarity
                ));
                out.push_str(&format!("  KEPT: {}\n", group.representative));
                for dup in group.duplicates.iter().take(5) {
                    out.push_str(&format!("  DUP:  {dup}\n"));
                }
                if group.duplicates.len() > 5 {
                    out.push_str(&format!("  ... and {} more\n", group.duplicates.len() - 5));
                }
            }
        }

        out
    }

    /// JSON rendering for machine consumers
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
