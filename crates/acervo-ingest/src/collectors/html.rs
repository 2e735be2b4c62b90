//! Selector-driven HTML collector and the HTTP fetcher it uses

use super::Collector;
use crate::config::FetchConfig;
use crate::error::CollectError;
use crate::retry::RetryPolicy;
use acervo_common::types::{clean_text, RawRecord};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ============================================================================
// Fetching
// ============================================================================

/// HTTP GET with timeout, retry policy and a politeness pause
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
    request_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, CollectError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            policy: config.retry_policy(),
            request_delay: config.request_delay(),
        })
    }

    /// Fetch a page body, retrying transient failures
    ///
    /// Sleeps for the configured request delay after every successful fetch.
    pub async fn fetch(&self, url: &str) -> Result<String, CollectError> {
        let body = self
            .policy
            .run(url, || self.fetch_once(url), CollectError::is_transient)
            .await?;

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        Ok(body)
    }

    async fn fetch_once(&self, url: &str) -> Result<String, CollectError> {
        let http_error = |source| CollectError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(http_error)
    }
}

// ============================================================================
// Source definition
// ============================================================================

/// Selectors and defaults for one HTML source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlSource {
    pub name: String,
    pub urls: Vec<String>,
    /// One raw record per match
    pub item_selector: String,
    pub term_selector: String,
    pub meaning_selector: String,
    #[serde(default)]
    pub example_selector: Option<String>,
    /// Overrides `kind` when it matches inside the item
    #[serde(default)]
    pub kind_selector: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub region: Option<String>,
}

fn default_kind() -> String {
    "giria".to_string()
}

impl HtmlSource {
    fn selectors(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.item_selector.as_str()),
            Some(self.term_selector.as_str()),
            Some(self.meaning_selector.as_str()),
            self.example_selector.as_deref(),
            self.kind_selector.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

fn parse_selector(selector: &str) -> Result<Selector, CollectError> {
    Selector::parse(selector).map_err(|e| CollectError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn first_text(item: &ElementRef<'_>, selector: Option<&Selector>) -> Option<String> {
    let element = item.select(selector?).next()?;
    let text = clean_text(&element.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// Extract one raw record per `item_selector` match
///
/// Fields whose selector finds nothing are left empty for the normalizer to
/// judge.
pub fn parse_page(html: &str, source: &HtmlSource) -> Result<Vec<RawRecord>, CollectError> {
    let item = parse_selector(&source.item_selector)?;
    let term = parse_selector(&source.term_selector)?;
    let meaning = parse_selector(&source.meaning_selector)?;
    let example = source.example_selector.as_deref().map(parse_selector).transpose()?;
    let kind = source.kind_selector.as_deref().map(parse_selector).transpose()?;

    let document = Html::parse_document(html);

    let records = document
        .select(&item)
        .map(|element| RawRecord {
            term: first_text(&element, Some(&term)),
            kind: first_text(&element, kind.as_ref()).or_else(|| Some(source.kind.clone())),
            meaning: first_text(&element, Some(&meaning)),
            usage_example: first_text(&element, example.as_ref()),
            region: source.region.clone(),
            flirt_context: None,
        })
        .collect();

    Ok(records)
}

// ============================================================================
// Collector
// ============================================================================

pub struct HtmlCollector {
    source: HtmlSource,
    fetcher: Arc<HttpFetcher>,
}

impl HtmlCollector {
    /// Build a collector, rejecting invalid selectors up front
    pub fn new(source: HtmlSource, fetcher: Arc<HttpFetcher>) -> Result<Self, CollectError> {
        for selector in source.selectors() {
            parse_selector(selector)?;
        }
        Ok(Self { source, fetcher })
    }
}

#[async_trait]
impl Collector for HtmlCollector {
    fn name(&self) -> &str {
        &self.source.name
    }

    /// Pages are fetched one after another; a page that still fails after
    /// retries is skipped. Only when every page fails does the source fail.
    async fn collect(&self) -> Result<Vec<RawRecord>, CollectError> {
        let mut records = Vec::new();
        let mut failed_pages = 0;

        for url in &self.source.urls {
            match self.fetcher.fetch(url).await {
                Ok(body) => {
                    let page = parse_page(&body, &self.source)?;
                    debug!(source = %self.source.name, "Parsed {} items from {}", page.len(), url);
                    records.extend(page);
                },
                Err(e) => {
                    warn!(source = %self.source.name, "Skipping page {}: {}", url, e);
                    failed_pages += 1;
                },
            }
        }

        if failed_pages > 0 && failed_pages == self.source.urls.len() {
            return Err(CollectError::AllPagesFailed(failed_pages));
        }

        info!(
            source = %self.source.name,
            "Scraped {} items from {} page(s)",
            records.len(),
            self.source.urls.len() - failed_pages
        );
        Ok(records)
    }
}
