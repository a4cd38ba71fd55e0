//! Enrichment engine: runs one query through search, extraction and summarization.
//!
//! Flow per hit: filter → fetch + extract → length gate → compress → summarize.
//! Hits are processed concurrently (bounded, completion order) and sorted back into
//! rank order, so a slow page never holds up the start of later hits.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::compress::compress_for_model;
use super::prompts::summary_prompt;
use super::{EnrichError, EnrichmentResult, PageFetcher, SearchHit, SearchProvider};
use crate::llm_client::ModelInvoker;

/// Extracted text shorter than this is treated as a failed extraction.
pub const MIN_EXTRACTED_CHARS: usize = 200;

pub const SKIPPED_NON_HTML: &str = "skipped non-HTML";
pub const SKIPPED_EMPTY_URL: &str = "skipped empty URL";
pub const TOO_LITTLE_TEXT: &str =
    "extracted too little text (blocked, JS-rendered, or not an article)";

const NON_HTML_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx"];

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    /// k: maximum hits taken from the search.
    pub results: usize,
    pub region: String,
    pub backend: String,
    pub max_input_chars: usize,
    pub max_output_tokens: u32,
    /// Bound for the search call and for each page fetch.
    pub timeout: Duration,
    pub concurrency: usize,
    pub save_path: Option<PathBuf>,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            results: 2,
            region: "vn-vi".to_string(),
            backend: "html".to_string(),
            max_input_chars: 12_000,
            max_output_tokens: 220,
            timeout: Duration::from_secs(20),
            concurrency: 3,
            save_path: None,
        }
    }
}

/// Full record of one enrichment run; also the persisted payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentReport {
    pub query: String,
    pub region: String,
    pub backend: String,
    pub model: String,
    pub max_input_chars: usize,
    pub max_output_tokens: u32,
    pub timeout_sec: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_error: Option<String>,
    pub results: Vec<EnrichmentResult>,
}

impl EnrichmentReport {
    /// Writes the payload as pretty JSON, creating parent directories.
    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

pub struct EnrichmentEngine {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    summarizer: ModelInvoker,
    settings: EnrichmentSettings,
}

impl EnrichmentEngine {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        summarizer: ModelInvoker,
        settings: EnrichmentSettings,
    ) -> Self {
        Self {
            search,
            fetcher,
            summarizer,
            settings,
        }
    }

    /// Runs the whole sub-pipeline for `query`. Never fails: problems land in the report.
    pub async fn run(&self, query: &str) -> EnrichmentReport {
        let created_at = Utc::now();
        info!(query, k = self.settings.results, "Starting web enrichment");

        let (hits, search_error) = match self.search_hits(query).await {
            Ok(hits) => (hits, None),
            Err(e) => {
                warn!(query, "Search failed: {e}");
                (Vec::new(), Some(format!("{}: {e}", e.kind())))
            }
        };

        let mut results: Vec<EnrichmentResult> = stream::iter(hits.into_iter().enumerate())
            .map(|(idx, hit)| self.process_hit(idx + 1, hit))
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;
        results.sort_by_key(|r| r.rank);

        let report = EnrichmentReport {
            query: query.to_string(),
            region: self.settings.region.clone(),
            backend: self.settings.backend.clone(),
            model: self.summarizer.model().to_string(),
            max_input_chars: self.settings.max_input_chars,
            max_output_tokens: self.settings.max_output_tokens,
            timeout_sec: self.settings.timeout.as_secs(),
            created_at,
            search_error,
            results,
        };

        info!(
            query,
            hits = report.results.len(),
            summarized = report.results.iter().filter(|r| r.is_ok()).count(),
            "Web enrichment finished"
        );

        if let Some(path) = &self.settings.save_path {
            match report.save(path).await {
                Ok(()) => info!("Saved enrichment payload to {}", path.display()),
                Err(e) => warn!("Failed to save enrichment payload: {e:#}"),
            }
        }

        report
    }

    async fn search_hits(&self, query: &str) -> Result<Vec<SearchHit>, EnrichError> {
        let search = self.search.search(
            query,
            self.settings.results,
            &self.settings.region,
            &self.settings.backend,
        );
        let mut hits = tokio::time::timeout(self.settings.timeout, search)
            .await
            .map_err(|_| EnrichError::Timeout(self.settings.timeout))??;
        hits.truncate(self.settings.results);
        Ok(hits)
    }

    async fn process_hit(&self, rank: usize, hit: SearchHit) -> EnrichmentResult {
        let mut item = EnrichmentResult::pending(rank, hit);

        if item.url.trim().is_empty() {
            return item.fail(SKIPPED_EMPTY_URL);
        }
        if is_probably_non_html(&item.url) {
            return item.fail(SKIPPED_NON_HTML);
        }

        let fetched = tokio::time::timeout(
            self.settings.timeout,
            self.fetcher.fetch_and_extract(&item.url, self.settings.timeout),
        )
        .await
        .map_err(|_| EnrichError::Timeout(self.settings.timeout))
        .and_then(|inner| inner);

        let text = match fetched {
            Ok(text) => text,
            Err(e) => {
                warn!(rank, url = %item.url, "Fetch/extract failed: {e}");
                return item.fail(format!("{}: {e}", e.kind()));
            }
        };

        let text = text.trim();
        item.extracted_chars = text.chars().count();
        if item.extracted_chars < MIN_EXTRACTED_CHARS {
            warn!(rank, url = %item.url, chars = item.extracted_chars, "Extracted text too short");
            return item.fail(TOO_LITTLE_TEXT);
        }

        let slim = compress_for_model(text, self.settings.max_input_chars);
        item.sent_chars = slim.chars().count();

        match self.summarizer.invoke_text(&summary_prompt(&slim)).await {
            Ok(summary) => {
                info!(
                    rank,
                    url = %item.url,
                    extracted_chars = item.extracted_chars,
                    sent_chars = item.sent_chars,
                    "Summarized enrichment hit"
                );
                item.summary = summary;
                item
            }
            Err(e) => {
                warn!(rank, url = %item.url, "Summary failed: {e}");
                item.fail(format!("{}: {e}", e.kind()))
            }
        }
    }
}

/// True when the URL path ends in a document extension such as `.pdf` or `.docx`.
pub fn is_probably_non_html(raw: &str) -> bool {
    let path = match url::Url::parse(raw) {
        Ok(url) => url.path().to_lowercase(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_lowercase(),
    };
    NON_HTML_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")))
}
