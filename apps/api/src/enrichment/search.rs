//! DuckDuckGo search over its no-JS endpoints.
//!
//! `html` backend → html.duckduckgo.com/html, `lite` backend → lite.duckduckgo.com/lite.
//! Result links come back as `//duckduckgo.com/l/?uddg=<target>` redirects and are unwrapped.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::{EnrichError, SearchHit, SearchProvider};

const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const LITE_ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";
const SEARCH_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackend {
    Html,
    Lite,
}

impl SearchBackend {
    pub fn parse(name: &str) -> Result<Self, EnrichError> {
        match name.trim().to_lowercase().as_str() {
            "html" | "duckduckgo" | "auto" => Ok(SearchBackend::Html),
            "lite" => Ok(SearchBackend::Lite),
            other => Err(EnrichError::UnsupportedBackend(other.to_string())),
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            SearchBackend::Html => HTML_ENDPOINT,
            SearchBackend::Lite => LITE_ENDPOINT,
        }
    }
}

#[derive(Clone)]
pub struct DuckDuckGoSearch {
    client: Client,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration) -> Result<Self, EnrichError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        region: &str,
        backend: &str,
    ) -> Result<Vec<SearchHit>, EnrichError> {
        let backend = SearchBackend::parse(backend)?;
        if max_results == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(backend.endpoint())
            .header(USER_AGENT, SEARCH_USER_AGENT)
            .form(&[("q", query), ("kl", region)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let hits = match backend {
            SearchBackend::Html => parse_html_results(&body, max_results),
            SearchBackend::Lite => parse_lite_results(&body, max_results),
        };
        debug!(query, count = hits.len(), "Search returned hits");
        Ok(hits)
    }
}

/// Parses the `html` endpoint result page. Ads are skipped.
pub fn parse_html_results(body: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(body);
    let result = Selector::parse("div.result").expect("result selector");
    let title = Selector::parse("a.result__a").expect("title selector");
    let snippet = Selector::parse(".result__snippet").expect("snippet selector");

    document
        .select(&result)
        .filter(|el| !el.value().classes().any(|c| c == "result--ad"))
        .filter_map(|el| {
            let anchor = el.select(&title).next()?;
            let url = anchor.value().attr("href").map(resolve_result_url)?;
            Some(SearchHit {
                title: text_of(anchor),
                url,
                snippet: el.select(&snippet).next().map(text_of).unwrap_or_default(),
            })
        })
        .take(max_results)
        .collect()
}

/// Parses the `lite` endpoint: result links and snippets sit in alternating table rows.
pub fn parse_lite_results(body: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(body);
    let link = Selector::parse("a.result-link").expect("link selector");
    let snippet = Selector::parse("td.result-snippet").expect("snippet selector");

    let snippets: Vec<String> = document.select(&snippet).map(text_of).collect();
    document
        .select(&link)
        .enumerate()
        .filter_map(|(idx, anchor)| {
            let url = anchor.value().attr("href").map(resolve_result_url)?;
            Some(SearchHit {
                title: text_of(anchor),
                url,
                snippet: snippets.get(idx).cloned().unwrap_or_default(),
            })
        })
        .take(max_results)
        .collect()
}

/// Unwraps DuckDuckGo redirect links to the target URL.
pub fn resolve_result_url(href: &str) -> String {
    let href = href.trim();
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };

    match Url::parse(&absolute) {
        Ok(url) if url.path().starts_with("/l/") => url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned())
            .unwrap_or(absolute),
        _ => absolute,
    }
}

fn text_of(element: scraper::ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML_PAGE: &str = r#"
        <html><body>
          <div class="result results_links result--ad">
            <a class="result__a" href="https://ads.example.com">Sponsored</a>
          </div>
          <div class="result results_links">
            <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fvnexpress.net%2Fhoc-bong-123.html&amp;rut=abc">Học bổng   du học 2025</a></h2>
            <a class="result__snippet">Danh sách học bổng <b>mới nhất</b>.</a>
          </div>
          <div class="result results_links">
            <a class="result__a" href="https://example.org/guide.pdf">Guide PDF</a>
          </div>
          <div class="result results_links">
            <a class="result__a" href="https://example.com/third">Third</a>
            <div class="result__snippet">Third snippet</div>
          </div>
        </body></html>
    "#;

    const LITE_PAGE: &str = r#"
        <html><body><table>
          <tr><td><a class="result-link" href="https://a.example/one">One</a></td></tr>
          <tr><td class="result-snippet">First snippet</td></tr>
          <tr><td><a class="result-link" href="https://b.example/two">Two</a></td></tr>
          <tr><td class="result-snippet">Second snippet</td></tr>
        </table></body></html>
    "#;

    #[test]
    fn test_parse_html_results_skips_ads_and_unwraps_redirects() {
        let hits = parse_html_results(HTML_PAGE, 10);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Học bổng du học 2025");
        assert_eq!(hits[0].url, "https://vnexpress.net/hoc-bong-123.html");
        assert_eq!(hits[0].snippet, "Danh sách học bổng mới nhất.");
        assert_eq!(hits[1].url, "https://example.org/guide.pdf");
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn test_parse_html_results_respects_limit() {
        let hits = parse_html_results(HTML_PAGE, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].title, "Guide PDF");
    }

    #[test]
    fn test_parse_lite_results_pairs_snippets() {
        let hits = parse_lite_results(LITE_PAGE, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].title, "Two");
        assert_eq!(hits[1].snippet, "Second snippet");
    }

    #[test]
    fn test_resolve_plain_url_is_unchanged() {
        assert_eq!(
            resolve_result_url("https://example.com/a?b=1"),
            "https://example.com/a?b=1"
        );
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(SearchBackend::parse("duckduckgo").unwrap(), SearchBackend::Html);
        assert_eq!(SearchBackend::parse("LITE").unwrap(), SearchBackend::Lite);
        assert!(SearchBackend::parse("bing").is_err());
    }
}
