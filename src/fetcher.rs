//! Feed retrieval through a feed-to-JSON conversion endpoint.
//!
//! Each fetch follows a fixed sequence:
//!
//! 1. **Selection**: Pick one of the category's feed URLs uniformly at random
//! 2. **Retrieval**: Ask the conversion endpoint for `?rss_url=<feed>`
//! 3. **Normalization**: Map at most [`MAX_ITEMS`] items into [`Article`]s
//!
//! Random selection spreads load across sources and routes around a dead
//! one on the next cycle. Content for a category may therefore change
//! between cycles even when no news was published.

use crate::models::{Article, Category};
use crate::registry::SourceRegistry;
use chrono::{DateTime, NaiveDateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Default rss2json endpoint.
pub const DEFAULT_FEED_ENDPOINT: &str = "https://api.rss2json.com/v1/api.json";

/// Items kept per fetch. Each one costs up to two translation calls.
pub const MAX_ITEMS: usize = 10;

/// Errors that can occur while fetching a category.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Endpoint answered with a non-2xx status
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body was not the expected JSON document
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Status was not "ok", or no usable item was returned
    #[error("no items")]
    NoItems,
    /// The registry has no sources for this category
    #[error("No sources configured for {0}")]
    UnknownCategory(Category),
}

/// Response of the feed-to-JSON endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub items: Vec<FeedItem>,
}

/// One converted feed item, as delivered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Usually `{"link": ...}`, sometimes `{}` or `[]`.
    #[serde(default)]
    pub enclosure: Option<serde_json::Value>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl FeedItem {
    /// Enclosure link if present, else thumbnail, else nothing.
    pub fn image_url(&self) -> Option<String> {
        let enclosure = self
            .enclosure
            .as_ref()
            .and_then(|e| e.get("link"))
            .and_then(|l| l.as_str())
            .filter(|l| !l.is_empty());
        let thumbnail = self.thumbnail.as_deref().filter(|t| !t.is_empty());
        enclosure.or(thumbnail).map(str::to_string)
    }
}

/// Something that turns a feed URL into a [`FeedResponse`].
pub trait FeedEndpoint {
    async fn retrieve(&self, feed_url: &str) -> Result<FeedResponse, FetchError>;
}

/// HTTP client for an rss2json-compatible endpoint.
#[derive(Debug, Clone)]
pub struct Rss2JsonEndpoint {
    client: reqwest::Client,
    endpoint: String,
}

impl Rss2JsonEndpoint {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl FeedEndpoint for Rss2JsonEndpoint {
    #[instrument(level = "debug", skip_all, fields(%feed_url))]
    async fn retrieve(&self, feed_url: &str) -> Result<FeedResponse, FetchError> {
        let url = format!("{}?rss_url={}", self.endpoint, urlencoding::encode(feed_url));
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Picks a source for a category and normalizes what it returns.
#[derive(Debug)]
pub struct FeedFetcher<E> {
    endpoint: E,
    registry: Rc<SourceRegistry>,
    rng: RefCell<StdRng>,
}

impl<E> FeedFetcher<E>
where
    E: FeedEndpoint,
{
    pub fn new(endpoint: E, registry: Rc<SourceRegistry>) -> Self {
        Self::with_rng(endpoint, registry, StdRng::from_os_rng())
    }

    /// Build a fetcher with a fixed random source, so selection can be replayed.
    pub fn with_rng(endpoint: E, registry: Rc<SourceRegistry>, rng: StdRng) -> Self {
        Self {
            endpoint,
            registry,
            rng: RefCell::new(rng),
        }
    }

    /// Choose one feed URL for `category`, uniformly at random.
    pub fn select_source(&self, category: Category) -> Result<String, FetchError> {
        let feeds = self.registry.feeds(category);
        let mut rng = self.rng.borrow_mut();
        feeds
            .choose(&mut *rng)
            .cloned()
            .ok_or(FetchError::UnknownCategory(category))
    }

    /// Fetch up to [`MAX_ITEMS`] articles for `category`.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, category: Category) -> Result<Vec<Article>, FetchError> {
        let feed_url = self.select_source(category)?;
        let t0 = Instant::now();
        let response = self.endpoint.retrieve(&feed_url).await?;
        debug!(
            %feed_url,
            status = %response.status,
            items = response.items.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Feed endpoint answered"
        );
        let articles = normalize_response(response, Utc::now())?;
        info!(%feed_url, count = articles.len(), "Fetched feed");
        Ok(articles)
    }
}

/// Validate a response and map its first [`MAX_ITEMS`] items into articles.
pub fn normalize_response(
    response: FeedResponse,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<Article>, FetchError> {
    if response.status != "ok" || response.items.is_empty() {
        return Err(FetchError::NoItems);
    }

    Ok(response
        .items
        .into_iter()
        .take(MAX_ITEMS)
        .map(|item| {
            let image_url = item.image_url();
            Article {
                title: item.title.unwrap_or_default(),
                link: item.link.unwrap_or_else(|| "#".to_string()),
                published_at: item
                    .pub_date
                    .as_deref()
                    .and_then(parse_pub_date)
                    .unwrap_or(fetched_at),
                image_url,
                summary: item.description.unwrap_or_default(),
            }
        })
        .collect())
}

/// Parse the date formats seen from the conversion endpoint.
///
/// rss2json emits `YYYY-MM-DD HH:MM:SS` in UTC; raw RFC 3339 and RFC 2822
/// stamps are accepted too.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(n: usize) -> FeedItem {
        FeedItem {
            title: Some(format!("Item {n}")),
            link: Some(format!("https://example.com/{n}")),
            pub_date: Some("2025-05-06 10:00:00".to_string()),
            description: Some(format!("<p>Body {n}</p>")),
            ..Default::default()
        }
    }

    fn ok_response(count: usize) -> FeedResponse {
        FeedResponse {
            status: "ok".to_string(),
            items: (0..count).map(item).collect(),
        }
    }

    /// Returns the same canned response for any feed URL.
    struct StaticEndpoint(FeedResponse);

    impl FeedEndpoint for StaticEndpoint {
        async fn retrieve(&self, _feed_url: &str) -> Result<FeedResponse, FetchError> {
            Ok(self.0.clone())
        }
    }

    fn fetcher_with(response: FeedResponse, seed: u64) -> FeedFetcher<StaticEndpoint> {
        let registry = Rc::new(SourceRegistry::builtin(Utc::now()));
        FeedFetcher::with_rng(StaticEndpoint(response), registry, StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_cap_at_ten_in_response_order() {
        let articles = normalize_response(ok_response(25), Utc::now()).unwrap();
        assert_eq!(articles.len(), MAX_ITEMS);
        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        let expected: Vec<String> = (0..10).map(|n| format!("Item {n}")).collect();
        assert_eq!(titles, expected);
    }

    #[test]
    fn test_status_not_ok_is_no_items() {
        let mut response = ok_response(3);
        response.status = "error".to_string();
        assert!(matches!(
            normalize_response(response, Utc::now()),
            Err(FetchError::NoItems)
        ));
    }

    #[test]
    fn test_empty_items_is_no_items() {
        assert!(matches!(
            normalize_response(ok_response(0), Utc::now()),
            Err(FetchError::NoItems)
        ));
    }

    #[test]
    fn test_untitled_items_keep_their_slot() {
        let mut response = ok_response(25);
        response.items[3].title = Some(String::new());
        response.items[5].title = None;
        let articles = normalize_response(response, Utc::now()).unwrap();
        assert_eq!(articles.len(), MAX_ITEMS);
        assert_eq!(articles[3].title, "");
        assert_eq!(articles[3].link, "https://example.com/3");
        assert_eq!(articles[5].title, "");
        assert_eq!(articles[4].title, "Item 4");

        let mut response = ok_response(3);
        for item in &mut response.items {
            item.title = None;
        }
        let articles = normalize_response(response, Utc::now()).unwrap();
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].summary, "<p>Body 0</p>");
    }

    #[test]
    fn test_fields_are_copied_through() {
        let articles = normalize_response(ok_response(1), Utc::now()).unwrap();
        let a = &articles[0];
        assert_eq!(a.link, "https://example.com/0");
        assert_eq!(a.summary, "<p>Body 0</p>");
        assert_eq!(a.published_at, Utc.with_ymd_and_hms(2025, 5, 6, 10, 0, 0).unwrap());
        assert_eq!(a.image_url, None);
    }

    #[test]
    fn test_image_resolution_order() {
        let mut it = item(0);
        it.enclosure = Some(serde_json::json!({"link": "https://img/enc.jpg"}));
        it.thumbnail = Some("https://img/thumb.jpg".to_string());
        assert_eq!(it.image_url().as_deref(), Some("https://img/enc.jpg"));

        it.enclosure = Some(serde_json::json!({}));
        assert_eq!(it.image_url().as_deref(), Some("https://img/thumb.jpg"));

        it.enclosure = Some(serde_json::json!([]));
        it.thumbnail = Some(String::new());
        assert_eq!(it.image_url(), None);
    }

    #[test]
    fn test_parse_pub_date_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 5, 6, 10, 0, 0).unwrap();
        assert_eq!(parse_pub_date("2025-05-06 10:00:00"), Some(expected));
        assert_eq!(parse_pub_date("2025-05-06T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_pub_date("Tue, 06 May 2025 10:00:00 GMT"), Some(expected));
        assert_eq!(parse_pub_date("yesterday"), None);
    }

    #[test]
    fn test_unparseable_date_uses_fetch_time() {
        let mut response = ok_response(1);
        response.items[0].pub_date = Some("soon".to_string());
        let fetched_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let articles = normalize_response(response, fetched_at).unwrap();
        assert_eq!(articles[0].published_at, fetched_at);
    }

    #[test]
    fn test_select_source_covers_all_feeds() {
        let fetcher = fetcher_with(ok_response(1), 7);
        let feeds: HashSet<String> = fetcher
            .registry
            .feeds(Category::AgroUa)
            .iter()
            .cloned()
            .collect();
        let picked: HashSet<String> = (0..200)
            .map(|_| fetcher.select_source(Category::AgroUa).unwrap())
            .collect();
        assert_eq!(picked, feeds);
    }

    #[test]
    fn test_select_source_is_reproducible_with_seed() {
        let a = fetcher_with(ok_response(1), 42);
        let b = fetcher_with(ok_response(1), 42);
        for _ in 0..10 {
            assert_eq!(
                a.select_source(Category::WorldAgro).unwrap(),
                b.select_source(Category::WorldAgro).unwrap()
            );
        }
    }

    #[tokio::test]
    async fn test_fetch_caps_items() {
        let fetcher = fetcher_with(ok_response(25), 1);
        let articles = fetcher.fetch(Category::TechAgro).await.unwrap();
        assert_eq!(articles.len(), 10);
    }

    #[tokio::test]
    async fn test_rss2json_endpoint_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("rss_url", "https://kurkul.com/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status":"ok","feed":{},"items":[
                    {"title":"Wheat","link":"https://kurkul.com/1","pubDate":"2025-05-06 10:00:00",
                     "description":"<b>d</b>","enclosure":{"link":"https://img/1.jpg"},"thumbnail":""}
                ]}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let endpoint = Rss2JsonEndpoint::new(reqwest::Client::new(), mock_server.uri());
        let response = endpoint.retrieve("https://kurkul.com/rss").await.unwrap();
        assert_eq!(response.status, "ok");
        let articles = normalize_response(response, Utc::now()).unwrap();
        assert_eq!(articles[0].title, "Wheat");
        assert_eq!(articles[0].image_url.as_deref(), Some("https://img/1.jpg"));
    }

    #[tokio::test]
    async fn test_rss2json_endpoint_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let endpoint = Rss2JsonEndpoint::new(reqwest::Client::new(), mock_server.uri());
        match endpoint.retrieve("https://kurkul.com/rss").await {
            Err(FetchError::HttpStatus(500)) => {}
            other => panic!("Expected HttpStatus(500), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rss2json_endpoint_error_status_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"status":"error","message":"Cannot load feed"}"#),
            )
            .mount(&mock_server)
            .await;

        let endpoint = Rss2JsonEndpoint::new(reqwest::Client::new(), mock_server.uri());
        let response = endpoint.retrieve("https://kurkul.com/rss").await.unwrap();
        assert!(matches!(
            normalize_response(response, Utc::now()),
            Err(FetchError::NoItems)
        ));
    }
}
