//! Topic search: turns a topic into ranked candidate URLs.
//!
//! [`SearchProvider`] runs an ordered pair of [`SearchBackend`]s: a primary
//! backend with retry/backoff, then a degraded fallback that only exists to
//! keep the pipeline alive. An empty result is a valid outcome.

mod duckduckgo;
mod reference;

pub use duckduckgo::DuckDuckGoBackend;
pub use reference::ReferenceSiteBackend;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::SearchConfig;

/// Title used when a backend gives none.
pub const UNTITLED: &str = "Untitled";

/// An unverified search hit. Identity is the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

impl SearchCandidate {
    pub fn new(url: impl Into<String>, title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            snippet: snippet.into(),
        }
    }

    /// Wraps a user-supplied URL; `position` is 1-based.
    pub fn manual(position: usize, url: impl Into<String>) -> Self {
        Self::new(url, format!("Source {position}"), "")
    }
}

/// Errors raised by a search backend. They never leave [`SearchProvider`].
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Rate limited by search backend")]
    RateLimited,

    #[error("Search backend returned HTTP {status}")]
    Status { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse search results: {0}")]
    Parse(String),
}

impl SearchError {
    /// Whether this failure looks like throttling.
    ///
    /// Backends do not always surface a typed 429, so the message is inspected
    /// for the usual signatures as well.
    pub fn is_rate_limited(&self) -> bool {
        if matches!(self, SearchError::RateLimited | SearchError::Status { status: 429 }) {
            return true;
        }
        let msg = self.to_string().to_lowercase();
        msg.contains("ratelimit") || msg.contains("rate") || msg.contains("429")
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 429 => SearchError::RateLimited,
            Some(status) => SearchError::Status { status: status.as_u16() },
            None => SearchError::Network(err.to_string()),
        }
    }
}

/// One search strategy.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Returns up to `desired` candidates, best first.
    async fn attempt(&self, topic: &str, desired: usize) -> Result<Vec<SearchCandidate>, SearchError>;
}

/// Best-effort topic search as seen by the gatherer.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Never fails; an empty list means every strategy came up dry.
    async fn search(&self, topic: &str, desired: usize) -> Vec<SearchCandidate>;
}

/// Primary backend with retry, then fallback backend.
pub struct SearchProvider {
    primary: Box<dyn SearchBackend>,
    fallback: Box<dyn SearchBackend>,
    max_retries: usize,
    retry_delay: Duration,
}

impl SearchProvider {
    pub fn new(primary: Box<dyn SearchBackend>, fallback: Box<dyn SearchBackend>) -> Self {
        Self {
            primary,
            fallback,
            max_retries: crate::config::DEFAULT_SEARCH_MAX_RETRIES,
            retry_delay: Duration::from_secs(crate::config::DEFAULT_SEARCH_RETRY_DELAY_SECS),
        }
    }

    /// DuckDuckGo primary and reference-site fallback, tuned by `config`.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let primary = DuckDuckGoBackend::new(&config.duckduckgo_url)?;
        let fallback = ReferenceSiteBackend::new(config.fallback_limit);
        Ok(Self::new(Box::new(primary), Box::new(fallback))
            .with_retries(config.max_retries, config.retry_delay()))
    }

    pub fn with_retries(mut self, max_retries: usize, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Runs the primary backend under the retry policy.
    ///
    /// Returns `None` when the primary is exhausted.
    async fn search_primary(&self, topic: &str, desired: usize) -> Option<Vec<SearchCandidate>> {
        let backend = self.primary.name();
        // Set by a rate-limited attempt; replaces the base delay once.
        let mut pending_delay: Option<Duration> = None;

        for attempt in 0..self.max_retries {
            let is_last = attempt + 1 == self.max_retries;

            if attempt > 0 {
                let delay = pending_delay.take().unwrap_or(self.retry_delay);
                info!(backend, delay_secs = delay.as_secs(), "waiting before search retry");
                tokio::time::sleep(delay).await;
            }

            match self.primary.attempt(topic, desired).await {
                Ok(results) if !results.is_empty() => {
                    info!(backend, count = results.len(), topic, "search returned results");
                    return Some(results);
                }
                Ok(_) => {
                    warn!(backend, attempt = attempt + 1, topic, "search returned no results");
                }
                Err(e) if e.is_rate_limited() => {
                    warn!(backend, attempt = attempt + 1, "search rate limited");
                    if is_last {
                        warn!(backend, "rate limit persisted, switching to fallback");
                        break;
                    }
                    pending_delay = Some(self.retry_delay * 2);
                }
                Err(e) => {
                    error!(backend, attempt = attempt + 1, error = %e, "search failed");
                }
            }
        }

        None
    }
}

#[async_trait]
impl Searcher for SearchProvider {
    async fn search(&self, topic: &str, desired: usize) -> Vec<SearchCandidate> {
        if let Some(results) = self.search_primary(topic, desired).await {
            return results;
        }

        warn!(backend = self.fallback.name(), "primary search unavailable, using fallback");
        match self.fallback.attempt(topic, desired).await {
            Ok(results) if !results.is_empty() => {
                info!(backend = self.fallback.name(), count = results.len(), "fallback candidates");
                results
            }
            Ok(_) => {
                error!(topic, "all search strategies returned nothing");
                Vec::new()
            }
            Err(e) => {
                error!(error = %e, topic, "fallback search failed");
                Vec::new()
            }
        }
    }
}
