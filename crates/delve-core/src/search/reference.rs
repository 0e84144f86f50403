use async_trait::async_trait;

use super::{SearchBackend, SearchCandidate, SearchError};

/// Degraded backend: points at well-known reference sites for the topic.
///
/// These candidates are not guaranteed to be extractable.
pub struct ReferenceSiteBackend {
    limit: usize,
}

impl ReferenceSiteBackend {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

#[async_trait]
impl SearchBackend for ReferenceSiteBackend {
    fn name(&self) -> &str {
        "reference-sites"
    }

    async fn attempt(&self, topic: &str, desired: usize) -> Result<Vec<SearchCandidate>, SearchError> {
        let article = urlencoding::encode(&topic.replace(' ', "_")).into_owned();
        let query = urlencoding::encode(topic);

        let candidates = vec![
            SearchCandidate::new(
                format!("https://en.wikipedia.org/wiki/{article}"),
                format!("Wikipedia: {topic}"),
                format!("Information about {topic} from Wikipedia"),
            ),
            SearchCandidate::new(
                format!("https://www.britannica.com/search?query={query}"),
                format!("Britannica: {topic}"),
                format!("Encyclopedia article about {topic}"),
            ),
        ];

        Ok(candidates.into_iter().take(self.limit.min(desired)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fallback_urls() {
        let backend = ReferenceSiteBackend::new(2);
        let results = backend.attempt("vibe coding & AI", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://en.wikipedia.org/wiki/vibe_coding_%26_AI");
        assert_eq!(results[0].title, "Wikipedia: vibe coding & AI");
        assert_eq!(
            results[1].url,
            "https://www.britannica.com/search?query=vibe%20coding%20%26%20AI"
        );
    }

    #[tokio::test]
    async fn test_fallback_encodes_non_ascii() {
        let backend = ReferenceSiteBackend::new(2);
        let results = backend.attempt("café au lait", 2).await.unwrap();
        assert_eq!(results[0].url, "https://en.wikipedia.org/wiki/caf%C3%A9_au_lait");
        assert_eq!(results[1].url, "https://www.britannica.com/search?query=caf%C3%A9%20au%20lait");
    }

    #[tokio::test]
    async fn test_fallback_capped_by_desired() {
        let backend = ReferenceSiteBackend::new(2);
        let results = backend.attempt("rust", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].url.contains("wikipedia"));
    }
}
