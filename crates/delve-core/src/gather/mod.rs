//! Source acquisition: search, concurrent extraction, retry and backfill.
//!
//! Extraction failure is ordinary here. The [`Gatherer`] threads an
//! accumulator (accepted sources plus failed candidates) through up to three
//! rounds and returns whatever it managed to collect. Whether a short list is
//! fatal is the caller's decision.

mod event;

pub use event::{GatherEvent, RejectReason, Round};

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{Config, SOURCE_LOW_BAR_MIN_CHARS, SOURCE_MIN_CHARS};
use crate::extract::{trimmed_len, Extractor};
use crate::search::{SearchCandidate, Searcher};

/// A candidate whose content was extracted and accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub url: String,
    pub title: String,
    pub content: String,
    /// Set by relevance evaluation; 0 until then.
    pub similarity_score: f32,
}

impl Source {
    pub fn new(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
            similarity_score: 0.0,
        }
    }
}

/// Knobs read once when the gatherer is built.
#[derive(Debug, Clone)]
pub struct GatherSettings {
    /// Quota the retry and backfill rounds try to reach.
    pub min_sources: usize,
    /// Candidates requested from search, and the cap on returned sources.
    pub max_attempts: usize,
    /// Extractions in flight at once.
    pub max_concurrency: usize,
    /// Host fragments held to the lower content bar.
    pub low_bar_hosts: Vec<String>,
}

impl GatherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_sources: config.research.min_sources,
            max_attempts: config.research.max_source_attempts,
            max_concurrency: config.research.max_concurrent_extractions,
            low_bar_hosts: config.search.low_bar_hosts.clone(),
        }
    }
}

impl Default for GatherSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of one extraction task.
enum Outcome {
    Accepted(Source),
    Failed(SearchCandidate),
}

/// State carried across rounds.
#[derive(Default)]
struct Accumulator {
    accepted: Vec<Source>,
    failed: Vec<SearchCandidate>,
}

impl Accumulator {
    fn has_url(&self, url: &str) -> bool {
        self.accepted.iter().any(|s| s.url == url)
    }
}

/// Drives search and extraction until the quota is met or rounds run out.
pub struct Gatherer {
    searcher: Arc<dyn Searcher>,
    extractor: Arc<dyn Extractor>,
    settings: GatherSettings,
    limiter: Arc<Semaphore>,
    events: Option<UnboundedSender<GatherEvent>>,
}

impl Gatherer {
    pub fn new(searcher: Arc<dyn Searcher>, extractor: Arc<dyn Extractor>, settings: GatherSettings) -> Self {
        let limiter = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));
        Self {
            searcher,
            extractor,
            settings,
            limiter,
            events: None,
        }
    }

    /// Sends progress events to `tx` as the gather runs.
    pub fn with_events(mut self, tx: UnboundedSender<GatherEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn settings(&self) -> &GatherSettings {
        &self.settings
    }

    /// Collects sources for `topic`.
    ///
    /// With `manual_urls`, those URLs replace the initial search. Returns at
    /// most `max_attempts` sources; an empty list means nothing could be
    /// found or extracted.
    pub async fn gather(&self, topic: &str, manual_urls: Option<&[String]>) -> Vec<Source> {
        let min = self.settings.min_sources;
        let max = self.settings.max_attempts;

        let candidates = match manual_urls {
            Some(urls) if !urls.is_empty() => {
                info!(count = urls.len(), "using manually supplied URLs");
                self.emit(GatherEvent::ManualCandidates { count: urls.len() });
                urls.iter()
                    .enumerate()
                    .map(|(i, url)| SearchCandidate::manual(i + 1, url.clone()))
                    .collect()
            }
            _ => {
                self.emit(GatherEvent::Searching { desired: max });
                self.searcher.search(topic, max).await
            }
        };

        if candidates.is_empty() {
            error!(topic, "no search results for topic");
            self.emit(GatherEvent::Finished { accepted: 0, min_sources: min });
            return Vec::new();
        }
        self.emit(GatherEvent::CandidatesFound { count: candidates.len() });

        let mut acc = Accumulator::default();

        let first: Vec<_> = candidates.into_iter().take(max).collect();
        for outcome in self.run_round(Round::First, first).await {
            match outcome {
                Outcome::Accepted(source) => acc.accepted.push(source),
                Outcome::Failed(candidate) => acc.failed.push(candidate),
            }
        }

        if acc.accepted.len() < min && !acc.failed.is_empty() {
            let budget = max.saturating_sub(acc.accepted.len());
            let retry: Vec<_> = std::mem::take(&mut acc.failed).into_iter().take(budget).collect();
            // a second failure is final
            for outcome in self.run_round(Round::Retry, retry).await {
                if let Outcome::Accepted(source) = outcome {
                    acc.accepted.push(source);
                }
            }
        }

        if acc.accepted.len() < min {
            self.backfill(topic, &mut acc).await;
        }

        let mut sources = acc.accepted;
        sources.truncate(max);

        if sources.is_empty() {
            error!(topic, "no sources could be extracted from any URL");
        } else if sources.len() < min {
            warn!(accepted = sources.len(), min, "source quota not met");
        } else {
            info!(accepted = sources.len(), "gathered sources");
        }
        self.emit(GatherEvent::Finished {
            accepted: sources.len(),
            min_sources: min,
        });
        sources
    }

    /// Fresh search for twice the deficit, extracting at most the deficit.
    async fn backfill(&self, topic: &str, acc: &mut Accumulator) {
        let min = self.settings.min_sources;
        let deficit = min - acc.accepted.len();
        let desired = deficit * 2;

        info!(accepted = acc.accepted.len(), desired, "below quota, searching for more sources");
        self.emit(GatherEvent::Searching { desired });
        let fresh: Vec<_> = self
            .searcher
            .search(topic, desired)
            .await
            .into_iter()
            .filter(|c| !acc.has_url(&c.url))
            .take(deficit)
            .collect();

        if fresh.is_empty() {
            debug!("backfill search produced no new candidates");
            return;
        }
        self.emit(GatherEvent::CandidatesFound { count: fresh.len() });

        for outcome in self.run_round(Round::Backfill, fresh).await {
            if acc.accepted.len() >= min {
                break;
            }
            if let Outcome::Accepted(source) = outcome {
                acc.accepted.push(source);
            }
        }
    }

    /// Extracts every candidate concurrently and waits for all of them.
    async fn run_round(&self, round: Round, candidates: Vec<SearchCandidate>) -> Vec<Outcome> {
        info!(%round, count = candidates.len(), "starting extraction round");
        self.emit(GatherEvent::RoundStarted {
            round,
            count: candidates.len(),
        });

        let tasks = candidates.into_iter().map(|candidate| self.extract_one(candidate));
        let outcomes = join_all(tasks).await;

        let accepted = outcomes.iter().filter(|o| matches!(o, Outcome::Accepted(_))).count();
        info!(%round, accepted, failed = outcomes.len() - accepted, "extraction round finished");
        self.emit(GatherEvent::RoundFinished {
            round,
            accepted,
            failed: outcomes.len() - accepted,
        });
        outcomes
    }

    async fn extract_one(&self, candidate: SearchCandidate) -> Outcome {
        if candidate.url.is_empty() {
            return self.reject(candidate, RejectReason::MissingUrl);
        }

        let extracted = match self.limiter.acquire().await {
            Ok(_permit) => self.extractor.extract(&candidate.url).await,
            Err(e) => {
                warn!(url = %candidate.url, error = %e, "extraction pool closed");
                None
            }
        };

        let Some(result) = extracted else {
            return self.reject(candidate, RejectReason::ExtractionFailed);
        };

        let chars = trimmed_len(&result.text);
        let threshold = content_threshold(&candidate.url, &self.settings.low_bar_hosts);
        if chars <= threshold {
            return self.reject(candidate, RejectReason::TooShort { chars, threshold });
        }

        debug!(url = %candidate.url, medium = %result.medium, chars, "accepted source");
        self.emit(GatherEvent::Accepted {
            url: candidate.url.clone(),
            title: candidate.title.clone(),
            medium: result.medium,
            chars,
        });
        Outcome::Accepted(Source::new(candidate.url, candidate.title, result.text))
    }

    fn reject(&self, candidate: SearchCandidate, reason: RejectReason) -> Outcome {
        warn!(url = %candidate.url, %reason, "failed to extract content");
        self.emit(GatherEvent::Rejected {
            url: candidate.url.clone(),
            reason,
        });
        Outcome::Failed(candidate)
    }

    fn emit(&self, event: GatherEvent) {
        if let Some(tx) = &self.events {
            // a dropped receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }
}

/// Minimum trimmed content length a source from `url` must exceed.
pub fn content_threshold(url: &str, low_bar_hosts: &[String]) -> usize {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default();

    if low_bar_hosts.iter().any(|h| host.contains(h.as_str())) {
        SOURCE_LOW_BAR_MIN_CHARS
    } else {
        SOURCE_MIN_CHARS
    }
}
