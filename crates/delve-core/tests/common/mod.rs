//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use delve_core::extract::{ExtractionResult, Extractor, Medium};
use delve_core::gather::GatherSettings;
use delve_core::llm::{LLMError, LLM};
use delve_core::relevance::{Embedder, RelevanceError, RelevanceEvaluator};
use delve_core::search::{SearchCandidate, Searcher};

/// Replays canned search results, one list per call.
#[derive(Default)]
pub struct ScriptedSearcher {
    responses: Mutex<VecDeque<Vec<SearchCandidate>>>,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedSearcher {
    pub fn new(responses: Vec<Vec<&str>>) -> Self {
        let responses = responses
            .into_iter()
            .map(|urls| {
                urls.into_iter()
                    .map(|u| SearchCandidate::new(u, format!("Title of {u}"), ""))
                    .collect()
            })
            .collect();
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Searcher for ScriptedSearcher {
    async fn search(&self, _topic: &str, desired: usize) -> Vec<SearchCandidate> {
        self.calls.lock().unwrap().push(desired);
        self.responses.lock().unwrap().pop_front().unwrap_or_default()
    }
}

/// Per-URL queue of outcomes; an exhausted queue means failure.
#[derive(Default)]
pub struct ScriptedExtractor {
    script: Mutex<HashMap<String, VecDeque<Option<String>>>>,
    pub calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    delay: Duration,
}

impl ScriptedExtractor {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn script(self, url: &str, outcomes: Vec<Option<String>>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), outcomes.into_iter().collect());
        self
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, url: &str) -> Option<ExtractionResult> {
        self.calls.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self
            .script
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|q| q.pop_front())
            .flatten();
        next.map(|text| ExtractionResult {
            text,
            medium: Medium::Web,
        })
    }
}

/// Replays canned completions and records every prompt.
pub struct ScriptedLLM {
    responses: Mutex<VecDeque<Result<String, LLMError>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLLM {
    pub fn new(responses: Vec<Result<&str, LLMError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| r.map(str::to_string)).collect()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle that outlives moving the client into a generator.
    pub fn prompt_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }
}

#[async_trait]
impl LLM for ScriptedLLM {
    async fn generate(&self, prompt: &str, _system: &str) -> Result<String, LLMError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::ParseError("script exhausted".to_string())))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Embeds by keyword presence over [rust, python, cooking].
pub struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RelevanceError> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                ["rust", "python", "cooking"]
                    .iter()
                    .map(|k| if t.contains(k) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "keywords"
    }
}

pub fn keyword_evaluator() -> Arc<RelevanceEvaluator> {
    Arc::new(RelevanceEvaluator::new(Arc::new(KeywordEmbedder)))
}

pub fn ok() -> Option<String> {
    Some("x".repeat(150))
}

pub fn settings(min: usize, max: usize) -> GatherSettings {
    GatherSettings {
        min_sources: min,
        max_attempts: max,
        max_concurrency: 8,
        low_bar_hosts: vec!["wikipedia".to_string(), "britannica".to_string()],
    }
}
