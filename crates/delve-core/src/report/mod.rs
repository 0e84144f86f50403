//! Report synthesis and storage.

pub mod prompts;
mod store;

pub use store::{infer_topic, sanitize_topic, ReportStore, StorageError};

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::citation::{self, Citation};
use crate::config::ResearchConfig;
use crate::gather::Source;
use crate::llm::{LLMError, LLM};
use crate::relevance::RelevanceEvaluator;
use prompts::{build_report_prompt, MORE_COMPREHENSIVE_PROMPT, REPORT_SYSTEM_PROMPT};

/// Errors that can occur while generating a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No valid sources with URLs found for report generation")]
    NoValidSources,

    #[error("Failed to generate report after {attempts} attempts: {source}")]
    GenerationFailed {
        attempts: usize,
        #[source]
        source: LLMError,
    },
}

/// A finished report and the citations it was built from.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub text: String,
    pub citations: Vec<Citation>,
    pub quality: f32,
}

/// Generates cited reports with an LLM, re-prompting on low quality.
pub struct ReportGenerator<L: LLM> {
    llm: L,
    evaluator: Arc<RelevanceEvaluator>,
    quality_threshold: f32,
    max_attempts: usize,
}

impl<L: LLM> ReportGenerator<L> {
    pub fn new(llm: L, evaluator: Arc<RelevanceEvaluator>, config: &ResearchConfig) -> Self {
        Self {
            llm,
            evaluator,
            quality_threshold: config.report_quality_threshold,
            max_attempts: config.max_report_attempts.max(1),
        }
    }

    /// Writes a report on `topic` from `sources`.
    ///
    /// Sources without an http(s) URL are skipped. The last attempt is kept
    /// even if it scores below the quality threshold.
    pub async fn generate(&self, topic: &str, sources: &[Source]) -> Result<GeneratedReport, ReportError> {
        let valid = valid_sources(sources);
        if valid.is_empty() {
            return Err(ReportError::NoValidSources);
        }
        if valid.len() < sources.len() {
            warn!(excluded = sources.len() - valid.len(), "sources with invalid URLs were excluded");
        }

        let citations = Citation::from_sources(&valid);
        let mut prompt = build_report_prompt(topic, &valid, &citations);

        for attempt in 1..self.max_attempts {
            info!(attempt, max = self.max_attempts, model = self.llm.model(), "generating report");
            match self.llm.generate(&prompt, REPORT_SYSTEM_PROMPT).await {
                Ok(draft) => {
                    let quality = self.evaluator.score_report(topic, &draft).await;
                    if quality >= self.quality_threshold {
                        info!(attempt, quality, "report accepted");
                        return Ok(finish(draft, citations, quality));
                    }
                    warn!(attempt, quality, threshold = self.quality_threshold, "report below quality threshold, regenerating");
                    prompt.push_str(MORE_COMPREHENSIVE_PROMPT);
                }
                Err(e) => error!(attempt, error = %e, "report generation failed, retrying"),
            }
        }

        // the final attempt is kept whatever it scores
        info!(attempt = self.max_attempts, max = self.max_attempts, model = self.llm.model(), "generating report");
        let draft = self
            .llm
            .generate(&prompt, REPORT_SYSTEM_PROMPT)
            .await
            .map_err(|source| {
                error!(error = %source, "report generation failed");
                ReportError::GenerationFailed {
                    attempts: self.max_attempts,
                    source,
                }
            })?;

        let quality = self.evaluator.score_report(topic, &draft).await;
        if quality < self.quality_threshold {
            warn!(quality, threshold = self.quality_threshold, "max attempts reached, keeping report below threshold");
        }
        Ok(finish(draft, citations, quality))
    }
}

fn finish(draft: String, citations: Vec<Citation>, quality: f32) -> GeneratedReport {
    GeneratedReport {
        text: citation::enforce(&draft, &citations),
        citations,
        quality,
    }
}

/// Sources whose URL is usable as a citation link.
fn valid_sources(sources: &[Source]) -> Vec<Source> {
    sources
        .iter()
        .filter(|s| {
            let url = s.url.as_str();
            let ok = url.starts_with("http://") || url.starts_with("https://");
            if !ok {
                warn!(title = %s.title, url = %s.url, "source has no usable URL, skipping");
            }
            ok
        })
        .cloned()
        .collect()
}
