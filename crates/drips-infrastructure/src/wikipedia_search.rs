//! Wikipedia full-text search over the MediaWiki `list=search` API.
//!
//! One call fetches one page. The offset is derived from the page number and
//! the configured page size, so callers only ever think in pages.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;

use drips_core::FetchError;
use drips_core::config::SearchConfig;
use drips_core::search::{FetchOutcome, SearchFetcher, SearchQuery, SearchResultItem};

const ARTICLE_BASE_URL: &str = "https://en.wikipedia.org/wiki/";

/// Search fetcher backed by the public Wikipedia API.
#[derive(Clone)]
pub struct WikipediaSearchFetcher {
    client: Client,
    endpoint: String,
    limit: usize,
    timeout: Duration,
}

impl WikipediaSearchFetcher {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            limit: config.limit,
            timeout: config.request_timeout(),
        }
    }

    /// Page size sent as `srlimit`.
    pub fn limit(&self) -> usize {
        self.limit
    }

    fn build_request(&self, query: &SearchQuery) -> RequestBuilder {
        let params = [
            ("action", "query".to_string()),
            ("list", "search".to_string()),
            ("srwhat", "text".to_string()),
            ("srlimit", self.limit.to_string()),
            ("sroffset", query.offset(self.limit).to_string()),
            ("srsearch", query.text.clone()),
            ("format", "json".to_string()),
        ];

        self.client
            .get(&self.endpoint)
            .query(&params)
            .timeout(self.timeout)
    }
}

#[async_trait]
impl SearchFetcher for WikipediaSearchFetcher {
    async fn fetch(&self, query: &SearchQuery) -> FetchOutcome {
        tracing::debug!(
            "[WikipediaSearch] GET {} srsearch='{}' page={}",
            self.endpoint,
            query.text,
            query.page
        );

        let response = self
            .build_request(query)
            .send()
            .await
            .map_err(|err| FetchError::transport(format!("GET {} failed: {err}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::transport(format!(
                "GET {} returned HTTP {status}",
                self.endpoint
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::transport(format!("Failed to read search response: {err}")))?;

        let items = parse_search_response(&body)?;
        tracing::debug!(
            "[WikipediaSearch] '{}' page {} returned {} items",
            query.text,
            query.page,
            items.len()
        );
        Ok(items)
    }
}

#[derive(Deserialize)]
struct SearchEnvelope {
    query: QueryBlock,
}

#[derive(Deserialize)]
struct QueryBlock {
    search: Vec<Value>,
}

#[derive(Deserialize)]
struct RawHit {
    title: String,
    timestamp: String,
}

/// Maps a raw response body to result items.
///
/// An empty body is [`FetchError::NoData`]; a body without
/// `query.search[]` is [`FetchError::MalformedResponse`]. Individual hits
/// without a usable `title` or RFC 3339 `timestamp` are dropped.
pub fn parse_search_response(body: &[u8]) -> FetchOutcome {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FetchError::NoData);
    }

    let envelope: SearchEnvelope = serde_json::from_slice(body)?;

    let mut items = Vec::with_capacity(envelope.query.search.len());
    for (position, raw) in envelope.query.search.into_iter().enumerate() {
        match parse_hit(raw) {
            Ok(item) => items.push(item),
            Err(reason) => {
                tracing::debug!("[WikipediaSearch] Dropping hit #{}: {}", position, reason);
            }
        }
    }
    Ok(items)
}

fn parse_hit(raw: Value) -> Result<SearchResultItem, String> {
    let hit: RawHit = serde_json::from_value(raw).map_err(|e| e.to_string())?;

    if hit.title.trim().is_empty() {
        return Err("empty title".to_string());
    }

    let timestamp = DateTime::parse_from_rfc3339(&hit.timestamp)
        .map_err(|e| format!("bad timestamp '{}': {}", hit.timestamp, e))?
        .with_timezone(&Utc);

    Ok(SearchResultItem::new(hit.title, timestamp))
}

/// Article page for a result title, e.g. `Rust (programming language)` →
/// `https://en.wikipedia.org/wiki/Rust_(programming_language)`.
pub fn article_url(title: &str) -> Option<Url> {
    let mut url = Url::parse(ARTICLE_BASE_URL).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(&title.trim().replace(' ', "_"));
    Some(url)
}
