//! Embedding generation as an injected capability.
//!
//! The pipeline never constructs a model on its own: the orchestrator
//! receives an explicitly built [`Embedder`] instance, so two independent
//! runs in one process share no model or device state unless the caller
//! pools one deliberately. The bundled backend wraps `fastembed` behind
//! the `fastembed` cargo feature; when the capability cannot be
//! constructed the error surfaces at construction time, never as a silent
//! fallback to lexical-only behavior.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Maps a batch of strings to fixed-width dense vectors. Deterministic for
/// a fixed model and input; inference itself is a black box (possibly
/// batched/accelerated internally) behind a blocking call.
pub trait Embedder: Send + Sync {
    /// Encode every text, in order. A failure for any input fails the
    /// whole batch: silently dropping one record would corrupt cluster
    /// membership for its true duplicates.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Identifier of the underlying model, for logs and reports
    fn model_id(&self) -> &str;
}

/// Semantic-stage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model identifier understood by the backend
    pub model: String,
    /// Prefer an accelerator when the backend supports one
    pub use_gpu: bool,
    /// Inference batch size
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "paraphrase-multilingual-mpnet-base-v2".to_string(),
            use_gpu: false,
            batch_size: 32,
        }
    }
}

#[cfg(feature = "fastembed")]
pub use backend::FastEmbedder;

#[cfg(feature = "fastembed")]
mod backend {
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    use super::{Embedder, EmbeddingConfig};
    use crate::error::{QsiftError, Result};

    /// ONNX-backed sentence embedder. Model download/load happens once
    /// here, not per call.
    pub struct FastEmbedder {
        model: TextEmbedding,
        model_id: String,
        batch_size: usize,
    }

    impl FastEmbedder {
        pub fn new(config: &EmbeddingConfig) -> Result<Self> {
            let model_kind = resolve_model(&config.model)?;

            if config.use_gpu {
                tracing::warn!(
                    "use_gpu requested; execution provider selection is delegated to the ONNX runtime"
                );
            }

            tracing::info!(model = %config.model, "loading embedding model");
            let model = TextEmbedding::try_new(
                InitOptions::new(model_kind).with_show_download_progress(false),
            )
            .map_err(|e| {
                QsiftError::DependencyUnavailable(format!(
                    "failed to load embedding model '{}': {e}",
                    config.model
                ))
            })?;
            tracing::info!("embedding model loaded");

            Ok(Self {
                model,
                model_id: config.model.clone(),
                batch_size: config.batch_size,
            })
        }
    }

    fn resolve_model(name: &str) -> Result<EmbeddingModel> {
        match name {
            "paraphrase-multilingual-mpnet-base-v2" => Ok(EmbeddingModel::ParaphraseMLMpnetBaseV2),
            "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            other => Err(QsiftError::config(format!(
                "unsupported embedding model '{other}'"
            ))),
        }
    }

    impl Embedder for FastEmbedder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let refs: Vec<&String> = texts.iter().collect();
            self.model
                .embed(refs, Some(self.batch_size))
                .map_err(|e| {
                    QsiftError::DependencyUnavailable(format!("embedding inference failed: {e}"))
                })
        }

        fn model_id(&self) -> &str {
            &self.model_id
        }
    }
}
