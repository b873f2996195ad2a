//! **qsift** - Three-stage deduplication pipeline for large question datasets
//!
//! Removes exact, fuzzy (lexical), and semantic (embedding-based) duplicates
//! from natural-language query sets, with Union-Find clustering of similarity
//! pairs and pluggable representative selection. Sub-quadratic fuzzy matching
//! on large inputs via length-bucket candidate sampling under a global
//! comparison budget.

/// Command-line interface with clap integration
pub mod cli;

/// Error taxonomy (configuration, dependency, input validation)
pub mod error;

/// Core deduplication pipeline
pub mod core {
    /// Text normalization (NFC, case-folding, whitespace, punctuation)
    pub mod normalize;
    pub use normalize::{clean_question, is_valid_question, normalize, NormalizeOptions};

    /// Lexical similarity scoring (ratio / token_sort / token_set)
    pub mod lexical;
    pub use lexical::{lexical_similarity, FuzzyAlgorithm};

    /// Length-bucket candidate sampling under a comparison budget
    pub mod sampler;
    pub use sampler::sampled_fuzzy_pairs;

    /// Embedding capability trait and optional fastembed backend
    pub mod embed;
    pub use embed::{Embedder, EmbeddingConfig};

    /// Cosine similarity over embedding vectors
    pub mod semantic;
    pub use semantic::{cosine_matrix, cosine_similarity, find_similar_pairs};

    /// Union-Find clustering and representative selection
    pub mod cluster;
    pub use cluster::{cluster_by_pairs, SelectionStrategy, SimilarityPair, UnionFind};

    /// Run statistics and duplicate-group audit samples
    pub mod report;
    pub use report::{DeduplicationReport, MatchKind};

    /// Three-stage orchestrator over a record set
    pub mod pipeline;
    pub use pipeline::{Deduplicator, Outcome, Record, RunOutput};
}

/// Infrastructure - configuration and record adapters
pub mod infra {
    /// Typed, validated configuration with TOML loading
    pub mod config;
    pub use config::{load_config, PipelineConfig};

    /// CSV record adapter
    pub mod records;
    pub use records::{read_csv, write_csv, CsvTable};
}

// Strategic re-exports for library consumers
pub use self::core::{
    Deduplicator, Embedder, FuzzyAlgorithm, MatchKind, Outcome, Record, RunOutput,
    SelectionStrategy, SimilarityPair, UnionFind,
};
pub use error::{QsiftError, Result};
pub use infra::{load_config, PipelineConfig};
