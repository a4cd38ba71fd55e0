// Web enrichment: search → fetch → extract → compress → summarize.
// Failures stay on the single hit they happened to; a run always returns a full report.

pub mod compress;
pub mod engine;
pub mod extract;
pub mod prompts;
pub mod search;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::{EnrichmentEngine, EnrichmentSettings};
pub use extract::HttpFetcher;
pub use search::DuckDuckGoSearch;

/// One raw search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Outcome for one hit. A non-empty `error` always comes with an empty `summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    /// 1-based position in the search results.
    pub rank: usize,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub extracted_chars: usize,
    pub sent_chars: usize,
    pub summary: String,
    pub error: String,
}

impl EnrichmentResult {
    fn pending(rank: usize, hit: SearchHit) -> Self {
        let title = if hit.title.trim().is_empty() {
            "(no title)".to_string()
        } else {
            hit.title
        };
        Self {
            rank,
            title,
            url: hit.url,
            snippet: hit.snippet,
            extracted_chars: 0,
            sent_chars: 0,
            summary: String::new(),
            error: String::new(),
        }
    }

    fn fail(mut self, error: impl Into<String>) -> Self {
        self.summary.clear();
        self.error = error.into();
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_empty() && !self.summary.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("content type '{0}' is not HTML")]
    NotHtml(String),

    #[error("unsupported search backend '{0}'")]
    UnsupportedBackend(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl EnrichError {
    pub fn kind(&self) -> &'static str {
        match self {
            EnrichError::Http(_) | EnrichError::Status(_) | EnrichError::Timeout(_) => "FetchError",
            EnrichError::NotHtml(_) => "ExtractError",
            EnrichError::UnsupportedBackend(_) => "SearchError",
            EnrichError::InvalidUrl(_) => "UrlError",
        }
    }
}

/// Search collaborator.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        region: &str,
        backend: &str,
    ) -> Result<Vec<SearchHit>, EnrichError>;
}

/// Fetch + main-content extraction collaborator. Returns plain text, possibly empty.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_and_extract(&self, url: &str, timeout: Duration) -> Result<String, EnrichError>;
}
