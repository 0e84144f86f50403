//! Configuration management for delve.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `delve.toml` file
//! 3. User config `~/.config/delve/config.toml`
//! 4. Built-in defaults (lowest priority)
//!
//! The configuration is read once when the pipeline is constructed and is not
//! reloaded mid-run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source gathering and report thresholds.
    pub research: ResearchConfig,

    /// Search backend configuration.
    pub search: SearchConfig,

    /// LLM provider configuration.
    pub llm: LLMConfig,

    /// Embedding model configuration.
    pub embedding: EmbeddingConfig,

    /// Output locations.
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./delve.toml` (project local)
    /// 2. `~/.config/delve/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("delve.toml").exists() {
            return Self::from_file("delve.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("delve").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // Research overrides
        if let Some(n) = env_parse("DELVE_MIN_SOURCES") {
            self.research.min_sources = n;
        }
        if let Some(n) = env_parse("DELVE_MAX_SOURCE_ATTEMPTS") {
            self.research.max_source_attempts = n;
        }
        if let Some(n) = env_parse("DELVE_SOURCE_TIMEOUT") {
            self.research.source_timeout_secs = n;
        }
        if let Some(n) = env_parse("DELVE_MAX_CONCURRENT_EXTRACTIONS") {
            self.research.max_concurrent_extractions = n;
        }

        // LLM overrides
        if let Ok(provider) = std::env::var("DELVE_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("DELVE_LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Ok(url) = std::env::var("DELVE_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("DELVE_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }

        // Output overrides
        if let Ok(dir) = std::env::var("DELVE_REPORTS_DIR") {
            self.output.directory = dir;
        }
    }

    /// Checks cross-field invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let research = &self.research;
        if research.min_sources == 0 {
            return Err(ConfigError::Invalid("research.min_sources must be at least 1".into()));
        }
        if research.max_source_attempts < research.min_sources {
            return Err(ConfigError::Invalid(format!(
                "research.max_source_attempts ({}) must be >= research.min_sources ({})",
                research.max_source_attempts, research.min_sources
            )));
        }
        if research.source_timeout_secs == 0 {
            return Err(ConfigError::Invalid("research.source_timeout_secs must be positive".into()));
        }
        for (name, value) in [
            ("source_similarity_threshold", research.source_similarity_threshold),
            ("report_quality_threshold", research.report_quality_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "research.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Source gathering and report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Quota of accepted sources the gatherer tries to reach.
    pub min_sources: usize,

    /// Maximum candidates attempted per run; also caps the returned list.
    pub max_source_attempts: usize,

    /// Timeout for one source request, in seconds.
    pub source_timeout_secs: u64,

    /// Sources scoring below this similarity are dropped.
    pub source_similarity_threshold: f32,

    /// Reports scoring below this similarity are regenerated.
    pub report_quality_threshold: f32,

    /// Number of report generations attempted.
    pub max_report_attempts: usize,

    /// Worker bound for concurrent extractions within a round.
    pub max_concurrent_extractions: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            min_sources: DEFAULT_MIN_SOURCES,
            max_source_attempts: DEFAULT_MAX_SOURCE_ATTEMPTS,
            source_timeout_secs: DEFAULT_SOURCE_TIMEOUT_SECS,
            source_similarity_threshold: DEFAULT_SOURCE_SIMILARITY_THRESHOLD,
            report_quality_threshold: DEFAULT_REPORT_QUALITY_THRESHOLD,
            max_report_attempts: DEFAULT_MAX_REPORT_ATTEMPTS,
            max_concurrent_extractions: DEFAULT_MAX_CONCURRENT_EXTRACTIONS,
        }
    }
}

impl ResearchConfig {
    /// Per-request extraction timeout.
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

/// Search backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Attempts against the primary backend.
    pub max_retries: usize,

    /// Base delay between attempts, in seconds.
    pub retry_delay_secs: u64,

    /// Upper bound on fallback candidates.
    pub fallback_limit: usize,

    /// DuckDuckGo HTML endpoint.
    pub duckduckgo_url: String,

    /// Host substrings that get the lowered content bar.
    pub low_bar_hosts: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_SEARCH_MAX_RETRIES,
            retry_delay_secs: DEFAULT_SEARCH_RETRY_DELAY_SECS,
            fallback_limit: DEFAULT_FALLBACK_LIMIT,
            duckduckgo_url: DEFAULT_DUCKDUCKGO_URL.to_string(),
            low_bar_hosts: DEFAULT_LOW_BAR_HOSTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SearchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// Provider name: "ollama", "openai", or "openai-compatible".
    pub provider: String,

    /// Model name (provider-specific).
    pub model: Option<String>,

    /// Base URL for API.
    pub base_url: Option<String>,

    /// API key (can also be set via environment variable).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Nucleus sampling parameter.
    pub top_p: f32,

    /// Timeout for a single generation, in seconds.
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_LLM_PROVIDER.to_string(),
            model: None,
            base_url: None,
            api_key: None,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

impl LLMConfig {
    /// Get the model name, falling back to provider defaults.
    pub fn model_or_default(&self) -> String {
        self.model.clone().unwrap_or_else(|| match self.provider.as_str() {
            "ollama" => DEFAULT_OLLAMA_MODEL.to_string(),
            _ => DEFAULT_OPENAI_MODEL.to_string(),
        })
    }

    /// Get the base URL, falling back to provider defaults.
    pub fn base_url_or_default(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| match self.provider.as_str() {
            "ollama" => DEFAULT_OLLAMA_URL.to_string(),
            _ => DEFAULT_OPENAI_URL.to_string(),
        })
    }

    /// Get API key from config or environment.
    pub fn api_key_or_env(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("DELVE_LLM_API_KEY").ok())
            .or_else(|| match self.provider.as_str() {
                "ollama" => None,
                _ => std::env::var("OPENAI_API_KEY").ok(),
            })
    }
}

/// Embedding model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// fastembed model name.
    pub model: String,

    /// Model cache directory. Defaults to `~/.delve/cache`.
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            cache_dir: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn cache_dir_or_default(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".delve")
                .join("cache")
        })
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory reports are written to.
    pub directory: String,

    /// Log file the CLI appends to.
    pub log_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: DEFAULT_REPORTS_DIR.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.research.min_sources, DEFAULT_MIN_SOURCES);
        assert_eq!(config.research.max_source_attempts, DEFAULT_MAX_SOURCE_ATTEMPTS);
        assert_eq!(config.llm.provider, DEFAULT_LLM_PROVIDER);
        assert_eq!(config.output.directory, DEFAULT_REPORTS_DIR);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[research]"));
        assert!(toml_str.contains("[search]"));
        assert!(toml_str.contains("[llm]"));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_validate_rejects_attempts_below_quota() {
        let mut config = Config::default();
        config.research.min_sources = 6;
        config.research.max_source_attempts = 4;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        let mut config = Config::default();
        config.research.source_similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_or_default() {
        let mut config = LLMConfig::default();
        assert_eq!(config.model_or_default(), DEFAULT_OLLAMA_MODEL);

        config.provider = "openai".to_string();
        assert_eq!(config.model_or_default(), DEFAULT_OPENAI_MODEL);
        assert_eq!(config.base_url_or_default(), DEFAULT_OPENAI_URL);

        config.model = Some("custom-model".to_string());
        assert_eq!(config.model_or_default(), "custom-model");
    }
}
