//! Semantic relevance scoring of sources and reports against the topic.

mod embedder;

pub use embedder::{parse_model, Embedder, FastEmbedder};

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::RELEVANCE_CONTENT_CHARS;
use crate::gather::Source;

/// Errors from embedding and scoring.
#[derive(Debug, Error)]
pub enum RelevanceError {
    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("Embedding error: {0}")]
    Embedding(String),
}

/// Scores text against a topic with cosine similarity of embeddings.
#[derive(Clone)]
pub struct RelevanceEvaluator {
    embedder: Arc<dyn Embedder>,
}

impl RelevanceEvaluator {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Similarity of two texts, clamped to [0, 1]; 0 when embedding fails.
    pub fn similarity(&self, a: &str, b: &str) -> f32 {
        match self.embedder.embed(&[a.to_string(), b.to_string()]) {
            Ok(vectors) if vectors.len() == 2 => clamp_unit(cosine_similarity(&vectors[0], &vectors[1])),
            Ok(_) => {
                warn!("embedder returned the wrong number of vectors");
                0.0
            }
            Err(e) => {
                warn!(error = %e, "similarity calculation failed");
                0.0
            }
        }
    }

    /// Scores every source against `topic`, sorts best first and keeps
    /// those scoring at least `threshold`.
    ///
    /// A source whose embedding fails scores 0. Failing to embed the topic
    /// itself is an error.
    pub fn evaluate_sources(
        &self,
        topic: &str,
        mut sources: Vec<Source>,
        threshold: f32,
    ) -> Result<Vec<Source>, RelevanceError> {
        let topic_vec = self
            .embedder
            .embed(&[topic.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| RelevanceError::Embedding("no vector for topic".to_string()))?;

        for source in &mut sources {
            let text = format!("{}\n\n{}", source.title, prefix_chars(&source.content, RELEVANCE_CONTENT_CHARS));
            source.similarity_score = match self.embedder.embed(&[text]) {
                Ok(vectors) => vectors
                    .first()
                    .map(|v| clamp_unit(cosine_similarity(&topic_vec, v)))
                    .unwrap_or(0.0),
                Err(e) => {
                    warn!(url = %source.url, error = %e, "failed to score source");
                    0.0
                }
            };
        }

        sources.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));

        let total = sources.len();
        sources.retain(|s| s.similarity_score >= threshold);
        if sources.len() < total {
            info!(dropped = total - sources.len(), threshold, "filtered sources below threshold");
        }
        Ok(sources)
    }

    /// How closely a report tracks its topic.
    pub fn report_quality(&self, topic: &str, report: &str) -> f32 {
        self.similarity(topic, report)
    }

    /// [`evaluate_sources`](Self::evaluate_sources) on the blocking pool.
    pub async fn score_sources(
        &self,
        topic: &str,
        sources: Vec<Source>,
        threshold: f32,
    ) -> Result<Vec<Source>, RelevanceError> {
        let evaluator = self.clone();
        let topic = topic.to_string();
        tokio::task::spawn_blocking(move || evaluator.evaluate_sources(&topic, sources, threshold))
            .await
            .map_err(|e| RelevanceError::Embedding(format!("scoring task failed: {e}")))?
    }

    /// [`report_quality`](Self::report_quality) on the blocking pool; 0 if the task dies.
    pub async fn score_report(&self, topic: &str, report: &str) -> f32 {
        let evaluator = self.clone();
        let (topic, report) = (topic.to_string(), report.to_string());
        match tokio::task::spawn_blocking(move || evaluator.report_quality(&topic, &report)).await {
            Ok(quality) => quality,
            Err(e) => {
                warn!(error = %e, "report scoring task failed");
                0.0
            }
        }
    }
}

/// First `n` characters of `text`.
pub(crate) fn prefix_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn clamp_unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
