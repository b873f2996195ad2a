//! Typed, validated pipeline configuration.
//!
//! One explicit struct per stage with named, defaulted fields; a single
//! validation pass at load time reports every violation at once instead
//! of failing on first access. Loaded from `qsift.toml` (or an explicit
//! path) with `QSIFT_`-prefixed environment overrides.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::cluster::SelectionStrategy;
use crate::core::embed::EmbeddingConfig;
use crate::core::lexical::FuzzyAlgorithm;
use crate::core::normalize::NormalizeOptions;
use crate::core::report::DEFAULT_MAX_GROUP_SAMPLES;
use crate::error::{QsiftError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: InputConfig,
    pub normalize: NormalizeOptions,
    pub exact: ExactStageConfig,
    pub fuzzy: FuzzyStageConfig,
    pub semantic: SemanticStageConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Designated text column in the input records
    pub question_column: String,
    /// Validity bounds (character count after trimming)
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            question_column: "QueryText".to_string(),
            min_length: 10,
            max_length: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExactStageConfig {
    pub enabled: bool,
}

impl Default for ExactStageConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyStageConfig {
    pub enabled: bool,
    pub algorithm: FuzzyAlgorithm,
    /// Inclusive similarity threshold in [0,1]
    pub threshold: f64,
    /// Global comparison budget for the sampled path
    pub max_comparisons: usize,
    /// Engage length-bucket sampling when the full pairwise count
    /// exceeds `max_comparisons`
    pub use_sampling: bool,
    /// Seed for candidate subsampling, so sampled runs reproduce
    pub sample_seed: u64,
    /// Representative policy for fuzzy clusters
    pub strategy: SelectionStrategy,
}

impl Default for FuzzyStageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: FuzzyAlgorithm::TokenSortRatio,
            threshold: 0.85,
            max_comparisons: 100_000,
            use_sampling: true,
            sample_seed: 0,
            strategy: SelectionStrategy::First,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticStageConfig {
    /// Requires an embedding backend; enabling without one fails the run
    /// before any stage executes
    pub enabled: bool,
    #[serde(flatten)]
    pub embedding: EmbeddingConfig,
    /// Inclusive cosine threshold in [0,1]
    pub similarity_threshold: f64,
    /// Representative policy for semantic clusters (Best prefers longer,
    /// more complete questions)
    pub strategy: SelectionStrategy,
}

impl Default for SemanticStageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            embedding: EmbeddingConfig::default(),
            similarity_threshold: 0.85,
            strategy: SelectionStrategy::Best,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Cap on recorded duplicate-group audit samples
    pub max_group_samples: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_group_samples: DEFAULT_MAX_GROUP_SAMPLES,
        }
    }
}

impl PipelineConfig {
    /// Single eager validation pass; collects every violation
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.input.question_column.trim().is_empty() {
            problems.push("input.question_column must not be empty".to_string());
        }
        if self.input.max_length == 0 {
            problems.push("input.max_length must be positive".to_string());
        }
        if self.input.min_length > self.input.max_length {
            problems.push(format!(
                "input.min_length ({}) must not exceed input.max_length ({})",
                self.input.min_length, self.input.max_length
            ));
        }

        if !(0.0..=1.0).contains(&self.fuzzy.threshold) {
            problems.push(format!(
                "fuzzy.threshold ({}) must be within [0, 1]",
                self.fuzzy.threshold
            ));
        }
        if self.fuzzy.use_sampling && self.fuzzy.max_comparisons == 0 {
            problems.push("fuzzy.max_comparisons must be positive when sampling".to_string());
        }

        if !(0.0..=1.0).contains(&self.semantic.similarity_threshold) {
            problems.push(format!(
                "semantic.similarity_threshold ({}) must be within [0, 1]",
                self.semantic.similarity_threshold
            ));
        }
        if self.semantic.embedding.batch_size == 0 {
            problems.push("semantic.batch_size must be positive".to_string());
        }
        if self.semantic.embedding.model.trim().is_empty() {
            problems.push("semantic.model must not be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(QsiftError::Config(problems))
        }
    }
}

/// Load configuration: explicit path if given, else the first of
/// `qsift.toml` / `.qsift.toml` found in the working directory, with
/// `QSIFT_`-prefixed environment overrides. Missing files yield defaults.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut builder = config::Config::builder();

    match path {
        Some(p) => {
            if !p.exists() {
                return Err(QsiftError::config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            builder = builder.add_source(config::File::from(p));
        }
        None => {
            for candidate in ["qsift.toml", ".qsift.toml"] {
                if Path::new(candidate).exists() {
                    builder = builder.add_source(config::File::with_name(candidate));
                    break;
                }
            }
        }
    }

    builder = builder.add_source(config::Environment::with_prefix("QSIFT").separator("__"));

    let cfg = builder
        .build()
        .map_err(|e| QsiftError::config(format!("failed to load configuration: {e}")))?;
    let parsed: PipelineConfig = cfg
        .try_deserialize()
        .map_err(|e| QsiftError::config(format!("failed to parse configuration: {e}")))?;

    parsed.validate()?;
    Ok(parsed)
}

/// Write a default `qsift.toml` into `dir`
pub fn write_default(dir: &Path, force: bool) -> anyhow::Result<std::path::PathBuf> {
    let config_path = dir.join("qsift.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let toml_string = toml::to_string_pretty(&PipelineConfig::default())
        .context("Failed to serialize default config")?;
    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    Ok(config_path)
}
