//! Error taxonomy for the deduplication pipeline.
//!
//! Everything here is fatal to the current run: the caller decides whether
//! to retry or notify an operator. Record-level invalidity (empty / too
//! short / too long text) is a counted skip handled by the orchestrator,
//! not an error.

/// Domain-specific error taxonomy for the pipeline core
#[derive(Debug, thiserror::Error)]
pub enum QsiftError {
    /// Invalid configuration, detected eagerly before any stage work.
    /// Carries every violation found in a single validation pass.
    #[error("invalid configuration:\n{}", .0.iter().map(|p| format!("  - {p}")).collect::<Vec<_>>().join("\n"))]
    Config(Vec<String>),

    /// A required capability (embedding backend) could not be constructed.
    /// The semantic stage never silently downgrades to fuzzy-only behavior.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Input set is unusable: designated text column absent, unreadable
    /// rows, and similar load-time faults.
    #[error("input validation failed: {0}")]
    InputValidation(String),

    /// Adapter-level I/O failure (CSV read/write).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing/writing failure from the record adapter.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl QsiftError {
    /// Single-violation configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(vec![msg.into()])
    }
}

/// Convenience alias used throughout the core
pub type Result<T> = std::result::Result<T, QsiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_lists_all_violations() {
        let err = QsiftError::Config(vec![
            "fuzzy.threshold must be within [0, 1]".to_string(),
            "input.min_length must not exceed input.max_length".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("fuzzy.threshold"));
        assert!(msg.contains("min_length"));
    }
}
