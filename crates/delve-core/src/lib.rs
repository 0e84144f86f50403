//! Topic research: search the web, extract sources, score their relevance
//! and write a cited markdown report.

pub mod citation;
pub mod config;
pub mod extract;
pub mod gather;
pub mod llm;
pub mod relevance;
pub mod report;
pub mod research;
pub mod search;

pub use citation::{enforce, Citation};
pub use config::{Config, ConfigError};
pub use extract::{ExtractionResult, Extractor, HttpExtractor, Medium};
pub use gather::{GatherEvent, GatherSettings, Gatherer, Source};
pub use relevance::{Embedder, RelevanceError, RelevanceEvaluator};
pub use report::{GeneratedReport, ReportError, ReportGenerator, ReportStore, StorageError};
pub use research::{ResearchError, ResearchOutcome, ResearchProgress, ResearchRunner};
pub use search::{SearchCandidate, SearchError, SearchProvider, Searcher};
