//! Single-URL content extraction.
//!
//! One GET per URL, then either PDF text extraction or an ordered chain of
//! HTML strategies. Any failure for a URL is reported as `None`; nothing is
//! raised past [`Extractor::extract`].

mod html;
mod pdf;

pub use html::{
    ArticleStrategy, BoilerplateStrategy, DomStrategy, ExtractionStrategy, HtmlPipeline,
    MetadataStrategy,
};
pub use pdf::extract_pdf_text;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::DEFAULT_USER_AGENT;

/// What kind of document the text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medium {
    Pdf,
    Web,
}

impl Medium {
    pub fn as_str(&self) -> &'static str {
        match self {
            Medium::Pdf => "PDF",
            Medium::Web => "Web",
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text pulled out of one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub text: String,
    pub medium: Medium,
}

/// Fetches a URL and returns its readable text, or `None`.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, url: &str) -> Option<ExtractionResult>;
}

/// reqwest-backed extractor with a browser-like request signature.
pub struct HttpExtractor {
    client: Client,
    timeout: Duration,
    pipeline: Arc<HtmlPipeline>,
}

impl HttpExtractor {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            timeout,
            pipeline: Arc::new(HtmlPipeline::default()),
        })
    }

    /// Replaces the HTML strategy chain.
    pub fn with_pipeline(mut self, pipeline: HtmlPipeline) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }

    async fn extract_pdf(&self, url: &str, response: reqwest::Response) -> Option<ExtractionResult> {
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!(url, error = %e, "failed to read PDF body");
                return None;
            }
        };

        // pdf parsing is CPU bound
        let parsed = tokio::task::spawn_blocking(move || extract_pdf_text(&bytes)).await;
        match parsed {
            Ok(Some(text)) => Some(ExtractionResult { text, medium: Medium::Pdf }),
            Ok(None) => {
                warn!(url, "PDF yielded too little text");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "PDF extraction aborted");
                None
            }
        }
    }

    async fn extract_web(&self, url: &str, response: reqwest::Response) -> Option<ExtractionResult> {
        let html = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                warn!(url, error = %e, "failed to read response body");
                return None;
            }
        };

        let pipeline = Arc::clone(&self.pipeline);
        let outcome = tokio::task::spawn_blocking(move || pipeline.run(&html)).await;
        match outcome {
            Ok(Some((text, strategy))) => {
                debug!(url, strategy, chars = text.chars().count(), "extracted web content");
                Some(ExtractionResult { text, medium: Medium::Web })
            }
            Ok(None) => {
                warn!(url, "all extraction methods failed");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "HTML extraction aborted");
                None
            }
        }
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(&self, url: &str) -> Option<ExtractionResult> {
        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                warn!(url, "timeout extracting content");
                return None;
            }
            Err(e) => {
                warn!(url, error = %e, "request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "non-success status");
            return None;
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        if is_pdf(&content_type, url) {
            self.extract_pdf(url, response).await
        } else {
            self.extract_web(url, response).await
        }
    }
}

/// PDF by declared content type or by URL suffix.
pub fn is_pdf(content_type: &str, url: &str) -> bool {
    content_type.contains("pdf") || url.to_lowercase().ends_with(".pdf")
}

/// Length in characters after trimming, the unit every threshold uses.
pub(crate) fn trimmed_len(text: &str) -> usize {
    text.trim().chars().count()
}
