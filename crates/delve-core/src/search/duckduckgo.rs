use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{CaseSensitivity, Html, Selector};
use tracing::debug;
use url::Url;

use super::{SearchBackend, SearchCandidate, SearchError, UNTITLED};
use crate::config::DEFAULT_USER_AGENT;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Primary backend: the DuckDuckGo HTML endpoint, no API key required.
pub struct DuckDuckGoBackend {
    endpoint: String,
    client: Client,
}

impl DuckDuckGoBackend {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn attempt(&self, topic: &str, desired: usize) -> Result<Vec<SearchCandidate>, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("q", topic), ("kl", "wt-wt")])
            .header("Accept", "text/html")
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            return Err(SearchError::Status { status: status.as_u16() });
        }

        let body = response.text().await?;
        let results = parse_results(&body, desired)?;
        debug!(count = results.len(), "duckduckgo results parsed");
        Ok(results)
    }
}

/// Parses a DuckDuckGo HTML results page.
///
/// Ads and entries without a link are skipped; missing titles and snippets get
/// placeholder values.
pub(crate) fn parse_results(body: &str, desired: usize) -> Result<Vec<SearchCandidate>, SearchError> {
    let document = Html::parse_document(body);
    let result_sel = selector(".result")?;
    let link_sel = selector("a.result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let mut candidates = Vec::new();
    for result in document.select(&result_sel) {
        if candidates.len() >= desired {
            break;
        }
        if result.value().has_class("result--ad", CaseSensitivity::AsciiCaseInsensitive) {
            continue;
        }
        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };
        let url = link.value().attr("href").map(unwrap_redirect).unwrap_or_default();
        if url.is_empty() || is_duckduckgo(&url) {
            continue;
        }

        let title = collapse(&link.text().collect::<String>());
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|el| collapse(&el.text().collect::<String>()))
            .unwrap_or_default();

        candidates.push(SearchCandidate {
            url,
            title: if title.is_empty() { UNTITLED.to_string() } else { title },
            snippet,
        });
    }

    Ok(candidates)
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("{css}: {e}")))
}

/// DuckDuckGo wraps hits as `//duckduckgo.com/l/?uddg=<encoded>&rut=...`.
fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    if let Ok(parsed) = Url::parse(&absolute) {
        if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
            return target.into_owned();
        }
        if parsed.scheme() == "http" || parsed.scheme() == "https" {
            return absolute;
        }
    }
    String::new()
}

/// Ad clicks and other links that stay on DuckDuckGo itself.
fn is_duckduckgo(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
