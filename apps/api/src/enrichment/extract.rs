//! Page fetching and main-content extraction built on `scraper`.
//!
//! Extraction favours precision: navigation, tables, comment threads and other
//! chrome are dropped, link-heavy blocks are discarded, and repeated blocks
//! (cookie banners, "share this" strips) are kept once.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{EnrichError, PageFetcher};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Tags whose subtree never holds article text.
const EXCLUDED_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "form", "table", "script", "style", "noscript",
    "template", "svg", "button", "select",
];

/// class/id fragments marking boilerplate containers.
const EXCLUDED_MARKERS: &[&str] = &[
    "comment", "sidebar", "footer", "cookie", "share", "social", "related", "advert", "banner",
    "breadcrumb", "menu", "newsletter", "popup", "subscribe",
];

const BLOCK_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre"];

/// Blocks where more than this share of the text sits inside links are navigation.
const MAX_LINK_DENSITY: f64 = 0.5;

/// List items shorter than this are usually menu entries.
const MIN_LIST_ITEM_CHARS: usize = 20;

/// HTTP fetcher + extractor.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, EnrichError> {
        Ok(Self {
            client: Client::builder()
                .redirect(reqwest::redirect::Policy::limited(5))
                .build()?,
        })
    }

    /// Returns the body with its declared content type, if any.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<(Option<String>, Bytes), EnrichError> {
        let url = Url::parse(url)?;
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Some(content_type) = &content_type {
            let lowered = content_type.to_lowercase();
            if !lowered.contains("html") && !is_plain_text(&lowered) {
                return Err(EnrichError::NotHtml(content_type.clone()));
            }
        }

        Ok((content_type, response.bytes().await?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_and_extract(&self, url: &str, timeout: Duration) -> Result<String, EnrichError> {
        let (content_type, body) = self.fetch(url, timeout).await?;
        Ok(extract_text(&String::from_utf8_lossy(&body), content_type.as_deref()))
    }
}

fn is_plain_text(content_type: &str) -> bool {
    content_type.to_lowercase().contains("text/plain")
}

/// Readable text for a fetched body. Plain-text bodies are taken whole, one
/// collapsed line per non-blank source line; anything else goes through HTML extraction.
pub fn extract_text(body: &str, content_type: Option<&str>) -> String {
    match content_type {
        Some(content_type) if is_plain_text(content_type) => body
            .lines()
            .map(collapse_whitespace)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => extract_main_text(body),
    }
}

struct Selectors {
    article: Selector,
    main: Selector,
    body: Selector,
    blocks: Selector,
    links: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            article: Selector::parse("article").expect("article selector"),
            main: Selector::parse("main, [role=main]").expect("main selector"),
            body: Selector::parse("body").expect("body selector"),
            blocks: Selector::parse(&BLOCK_TAGS.join(", ")).expect("block selector"),
            links: Selector::parse("a").expect("link selector"),
        }
    }

    fn pick_root<'a>(&self, document: &'a Html) -> ElementRef<'a> {
        document
            .select(&self.article)
            .next()
            .or_else(|| document.select(&self.main).next())
            .or_else(|| document.select(&self.body).next())
            .unwrap_or_else(|| document.root_element())
    }
}

/// Extracts readable main text from an HTML document, one block per line.
pub fn extract_main_text(html: &str) -> String {
    let selectors = Selectors::new();
    let document = Html::parse_document(html);
    let root = selectors.pick_root(&document);

    let mut seen = HashSet::new();
    let mut lines = Vec::new();

    for element in root.select(&selectors.blocks) {
        if inside_block(&element) || inside_boilerplate(&element) {
            continue;
        }

        let text = collapse_whitespace(&element.text().collect::<String>());
        if text.is_empty() {
            continue;
        }

        let tag = element.value().name();
        let is_heading = tag.len() == 2 && tag.starts_with('h');
        if tag == "li" && text.chars().count() < MIN_LIST_ITEM_CHARS {
            continue;
        }
        if !is_heading && link_density(&element, &selectors.links, &text) > MAX_LINK_DENSITY {
            continue;
        }

        if seen.insert(text.clone()) {
            lines.push(text);
        }
    }

    lines.join("\n")
}

/// True when an ancestor is itself a block; the outer block already carries this text.
fn inside_block(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| BLOCK_TAGS.contains(&ancestor.value().name()))
}

fn inside_boilerplate(element: &ElementRef<'_>) -> bool {
    std::iter::once(*element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| {
            let value = el.value();
            if EXCLUDED_TAGS.contains(&value.name()) {
                return true;
            }
            let mut labels = value.classes().chain(value.id());
            labels.any(|label| {
                let label = label.to_lowercase();
                EXCLUDED_MARKERS.iter().any(|marker| label.contains(marker))
            })
        })
}

fn link_density(element: &ElementRef<'_>, links: &Selector, text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = element
        .select(links)
        .map(|a| collapse_whitespace(&a.text().collect::<String>()).chars().count())
        .sum();
    linked as f64 / total as f64
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
