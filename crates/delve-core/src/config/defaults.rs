//! Default values for delve configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Research Defaults
// ============================================================================

/// Minimum number of accepted sources the gatherer tries to reach.
pub const DEFAULT_MIN_SOURCES: usize = 5;

/// Maximum number of candidates attempted (and sources returned).
pub const DEFAULT_MAX_SOURCE_ATTEMPTS: usize = 10;

/// Per-request timeout for source extraction, in seconds.
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 30;

/// Minimum similarity between topic and source to keep the source.
pub const DEFAULT_SOURCE_SIMILARITY_THRESHOLD: f32 = 0.6;

/// Minimum similarity between topic and report to accept a generation.
pub const DEFAULT_REPORT_QUALITY_THRESHOLD: f32 = 0.7;

/// Number of report generations attempted before giving up on quality.
pub const DEFAULT_MAX_REPORT_ATTEMPTS: usize = 3;

/// Upper bound on in-flight extractions within one round.
pub const DEFAULT_MAX_CONCURRENT_EXTRACTIONS: usize = 8;

// ============================================================================
// Search Defaults
// ============================================================================

/// Attempts made against the primary search backend.
pub const DEFAULT_SEARCH_MAX_RETRIES: usize = 2;

/// Base delay between search attempts, in seconds. Rate limiting doubles it.
pub const DEFAULT_SEARCH_RETRY_DELAY_SECS: u64 = 5;

/// Number of synthesized candidates the fallback backend may return.
pub const DEFAULT_FALLBACK_LIMIT: usize = 2;

/// DuckDuckGo HTML endpoint.
pub const DEFAULT_DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";

/// Hosts whose pages are accepted with the lowered content bar.
pub const DEFAULT_LOW_BAR_HOSTS: &[&str] = &["wikipedia", "britannica"];

// ============================================================================
// Extraction Defaults
// ============================================================================

/// Browser-like User-Agent sent with every source request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Minimum trimmed length for text extracted from a PDF.
pub const PDF_MIN_CHARS: usize = 50;

/// Minimum length for the precise HTML strategies.
pub const HTML_MIN_CHARS: usize = 100;

/// Lowered bar used by the last-resort strategies.
pub const HTML_LOW_BAR_CHARS: usize = 50;

/// Content bar for ordinary hosts when accepting a source.
pub const SOURCE_MIN_CHARS: usize = 100;

/// Content bar for low-bar hosts when accepting a source.
pub const SOURCE_LOW_BAR_MIN_CHARS: usize = 50;

// ============================================================================
// LLM Defaults
// ============================================================================

/// Default LLM provider.
pub const DEFAULT_LLM_PROVIDER: &str = "ollama";

/// Default Ollama API URL (OpenAI-compatible endpoint).
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/v1";
/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "gpt-oss:20b";

/// Default OpenAI API URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Sampling temperature sent with every generation.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Nucleus sampling parameter sent with every generation.
pub const DEFAULT_TOP_P: f32 = 0.9;

/// Timeout for a single generation request, in seconds.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// Embedding Defaults
// ============================================================================

/// Default fastembed model name.
pub const DEFAULT_EMBEDDING_MODEL: &str = "BGESmallENV15";

/// Characters of source content used when scoring relevance.
pub const RELEVANCE_CONTENT_CHARS: usize = 500;

// ============================================================================
// Output Defaults
// ============================================================================

/// Directory reports are written to.
pub const DEFAULT_REPORTS_DIR: &str = "./research_reports";

/// Log file appended to by the CLI.
pub const DEFAULT_LOG_FILE: &str = "./delve.log";

/// Maximum length of the sanitized topic in report file names.
pub const MAX_REPORT_NAME_CHARS: usize = 100;

/// Characters of each source's content included in the report prompt.
pub const PROMPT_CONTENT_CHARS: usize = 2000;
