//! Local text embeddings via fastembed.

use std::path::PathBuf;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use super::RelevanceError;
use crate::config::EmbeddingConfig;

/// Turns text into vectors.
pub trait Embedder: Send + Sync {
    /// Embeds a batch of texts, one vector per input.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RelevanceError>;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// FastEmbed-backed embedder running an ONNX model locally.
pub struct FastEmbedder {
    model: TextEmbedding,
    model_name: String,
}

impl FastEmbedder {
    /// Loads the configured model, downloading it into the cache on first use.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, RelevanceError> {
        let model = parse_model(&config.model)?;
        Self::with_model_and_cache(model, config.cache_dir_or_default())
    }

    /// Create a new FastEmbed embedder with a specific model and cache directory.
    pub fn with_model_and_cache(model: EmbeddingModel, cache_dir: PathBuf) -> Result<Self, RelevanceError> {
        let model_name = format!("{:?}", model);

        std::fs::create_dir_all(&cache_dir)
            .map_err(|e| RelevanceError::Embedding(format!("Failed to create cache directory: {}", e)))?;

        info!(model = %model_name, cache = %cache_dir.display(), "loading embedding model");
        let text_embedding = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(true),
        )
        .map_err(|e| RelevanceError::ModelLoad(e.to_string()))?;

        Ok(Self {
            model: text_embedding,
            model_name,
        })
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RelevanceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let texts_vec: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();

        self.model
            .embed(texts_vec, None)
            .map_err(|e| RelevanceError::Embedding(e.to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Maps a configured model name onto a fastembed model.
pub fn parse_model(name: &str) -> Result<EmbeddingModel, RelevanceError> {
    match name {
        "BGESmallENV15" | "BAAI/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" | "BAAI/bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "AllMiniLML6V2" | "sentence-transformers/all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        other => Err(RelevanceError::UnknownModel(other.to_string())),
    }
}
