use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

use crate::config::{Config, ConfigError};
use crate::extract::HttpExtractor;
use crate::gather::{GatherEvent, Gatherer, GatherSettings, Source};
use crate::llm::{LLMError, Provider, LLM};
use crate::relevance::{FastEmbedder, RelevanceError, RelevanceEvaluator};
use crate::report::{GeneratedReport, ReportError, ReportGenerator, ReportStore, StorageError};
use crate::search::{SearchError, SearchProvider};

/// Stage notifications for a front end.
#[derive(Debug, Clone)]
pub enum ResearchProgress {
    Gathering,
    Evaluating { count: usize },
    SourcesSelected { sources: Vec<Source> },
    Generating { count: usize },
    Saved { path: PathBuf },
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub report_path: PathBuf,
    /// Sources that passed the relevance threshold, best first.
    pub sources: Vec<Source>,
    pub report: GeneratedReport,
}

/// Runs gather, evaluate, generate and save for one topic.
pub struct ResearchRunner<L: LLM> {
    gatherer: Gatherer,
    evaluator: Arc<RelevanceEvaluator>,
    generator: ReportGenerator<L>,
    store: ReportStore,
    similarity_threshold: f32,
    progress: Option<UnboundedSender<ResearchProgress>>,
}

impl ResearchRunner<Box<dyn LLM>> {
    /// Builds the production pipeline: DuckDuckGo search, HTTP extraction,
    /// fastembed scoring and the configured LLM provider.
    pub fn from_config(config: &Config) -> Result<Self, ResearchError> {
        let searcher = SearchProvider::from_config(&config.search)?;
        let extractor = HttpExtractor::new(config.research.source_timeout())?;
        let gatherer = Gatherer::new(
            Arc::new(searcher),
            Arc::new(extractor),
            GatherSettings::from_config(config),
        );

        let embedder = FastEmbedder::from_config(&config.embedding)?;
        let evaluator = Arc::new(RelevanceEvaluator::new(Arc::new(embedder)));

        let llm = Provider::from_config(&config.llm)?.build(&config.llm)?;
        let generator = ReportGenerator::new(llm, Arc::clone(&evaluator), &config.research);

        Ok(Self::new(
            gatherer,
            evaluator,
            generator,
            ReportStore::from_config(&config.output),
            config.research.source_similarity_threshold,
        ))
    }
}

impl<L: LLM> ResearchRunner<L> {
    pub fn new(
        gatherer: Gatherer,
        evaluator: Arc<RelevanceEvaluator>,
        generator: ReportGenerator<L>,
        store: ReportStore,
        similarity_threshold: f32,
    ) -> Self {
        Self {
            gatherer,
            evaluator,
            generator,
            store,
            similarity_threshold,
            progress: None,
        }
    }

    /// Sends stage notifications to `tx`.
    pub fn with_progress(mut self, tx: UnboundedSender<ResearchProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Forwards the gatherer's per-source events to `tx`.
    pub fn with_gather_events(mut self, tx: UnboundedSender<GatherEvent>) -> Self {
        self.gatherer = self.gatherer.with_events(tx);
        self
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    /// Researches `topic` and saves the report.
    ///
    /// `manual_urls` bypasses the initial search.
    pub async fn run(&self, topic: &str, manual_urls: Option<&[String]>) -> Result<ResearchOutcome, ResearchError> {
        // 1. Gather
        self.emit(ResearchProgress::Gathering);
        let gathered = self.gatherer.gather(topic, manual_urls).await;
        if gathered.is_empty() {
            error!(topic, "failed to gather any sources");
            return Err(ResearchError::NoSources);
        }

        // 2. Score and filter
        self.emit(ResearchProgress::Evaluating { count: gathered.len() });
        let sources = self
            .evaluator
            .score_sources(topic, gathered, self.similarity_threshold)
            .await?;
        if sources.is_empty() {
            return Err(ResearchError::NoRelevantSources {
                threshold: self.similarity_threshold,
            });
        }
        info!(count = sources.len(), "sources above relevance threshold");
        self.emit(ResearchProgress::SourcesSelected { sources: sources.clone() });

        // 3. Generate
        self.emit(ResearchProgress::Generating { count: sources.len() });
        let report = self.generator.generate(topic, &sources).await?;

        // 4. Save
        let report_path = self.store.save(topic, &report.text)?;
        self.emit(ResearchProgress::Saved {
            path: report_path.clone(),
        });

        Ok(ResearchOutcome {
            report_path,
            sources,
            report,
        })
    }

    fn emit(&self, progress: ResearchProgress) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(progress);
        }
    }
}

/// Errors that can occur during a research run.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    LLM(#[from] LLMError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Relevance error: {0}")]
    Relevance(#[from] RelevanceError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to gather any sources")]
    NoSources,

    #[error("No sources met the similarity threshold ({threshold})")]
    NoRelevantSources { threshold: f32 },
}
