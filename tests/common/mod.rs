// tests/common/mod.rs
// Shared fixture wiring for the integration tests. No network is touched:
// every URL is served by a counting in-memory fetcher.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use wire_digest::aggregate::Aggregator;
use wire_digest::api::AppState;
use wire_digest::cache::TtlCache;
use wire_digest::config::AppConfig;
use wire_digest::ingest::fetch::Fetcher;
use wire_digest::sanitize::ContentSanitizer;
use wire_digest::scheduler::HealthState;
use wire_digest::scrape::limiter::{LimiterConfig, RateLimiter};
use wire_digest::scrape::{ArticleScraper, ScrapedArticle};

/// Serves fixed bodies by URL and counts every call. Unknown URLs fail,
/// as do URLs registered with [`MockFetcher::with_failure`].
#[derive(Default)]
pub struct MockFetcher {
    bodies: HashMap<String, std::result::Result<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.bodies.insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.bodies.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(msg)) => Err(anyhow::anyhow!("GET {url}: {msg}")),
            None => Err(anyhow::anyhow!("GET {url}: no such fixture")),
        }
    }
}

pub const WIRE_URL: &str = "https://wire.test/rss";

pub const WIRE_XML: &str = include_str!("../fixtures/wire.xml");
pub const SPORTAS_XML: &str = include_str!("../fixtures/topic_sportas.xml");
pub const ITT_XML: &str = include_str!("../fixtures/topic_itt.xml");
pub const UNMAPPED_XML: &str = include_str!("../fixtures/topic_unmapped.xml");
pub const ARTICLE_HTML: &str = include_str!("../fixtures/article.html");
pub const ARTICLE_NO_HERO_HTML: &str = include_str!("../fixtures/article_no_hero.html");
pub const ARTICLE_EMPTY_HTML: &str = include_str!("../fixtures/article_empty.html");

/// Wire + topic feeds. The `Kultūra` topic is left unregistered so it fails.
pub fn feed_fetcher() -> MockFetcher {
    MockFetcher::new()
        .with_body(WIRE_URL, WIRE_XML)
        .with_body("https://wire.test/sportas/rss", SPORTAS_XML)
        .with_body("https://wire.test/itt/RSS", ITT_XML)
        .with_body("https://wire.test/nezinoma/rss", UNMAPPED_XML)
}

/// Article pages for every item that survives dedup.
pub fn article_fetcher() -> MockFetcher {
    MockFetcher::new()
        .with_body("https://wire.test/a/s-1", ARTICLE_HTML)
        .with_body("https://wire.test/a/s-2", ARTICLE_NO_HERO_HTML)
        .with_body("https://wire.test/a/shared-1", ARTICLE_HTML)
        .with_body("https://wire.test/a/i-1", ARTICLE_HTML)
        .with_body("https://wire.test/a/i-3", ARTICLE_EMPTY_HTML)
        .with_body("https://wire.test/a/u-1", ARTICLE_HTML)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        feed_url: WIRE_URL.to_string(),
        public_base_url: "https://digest.test".to_string(),
        limiter: LimiterConfig {
            max_concurrent: 2,
            min_spacing_ms: 0,
        },
        ..AppConfig::default()
    }
}

pub fn state_with(
    cfg: &AppConfig,
    feeds: Arc<dyn Fetcher>,
    articles: Arc<dyn Fetcher>,
) -> AppState {
    wire_digest::build_state(cfg, feeds, articles).expect("state builds")
}

pub fn fixture_state() -> (AppState, Arc<MockFetcher>, Arc<MockFetcher>) {
    let feeds = Arc::new(feed_fetcher());
    let articles = Arc::new(article_fetcher());
    let state = state_with(&test_config(), feeds.clone(), articles.clone());
    (state, feeds, articles)
}

/// Aggregator wired by hand so tests can look inside both caches.
pub struct Harness {
    pub aggregator: Arc<Aggregator>,
    pub health: Arc<HealthState>,
    pub feed_cache: Arc<TtlCache<String, String>>,
    pub article_cache: Arc<TtlCache<String, ScrapedArticle>>,
}

pub fn harness(
    feeds: Arc<dyn Fetcher>,
    articles: Arc<dyn Fetcher>,
    article_ttl: Duration,
) -> Harness {
    let cfg = test_config();
    let feed_cache = Arc::new(TtlCache::new());
    let article_cache = Arc::new(TtlCache::new());

    let scraper = ArticleScraper::new(
        articles,
        Arc::new(RateLimiter::new(cfg.limiter)),
        article_cache.clone(),
        ContentSanitizer::new(&cfg.sanitizer).expect("default selectors parse"),
    )
    .with_ttl(article_ttl);

    let aggregator = Aggregator::new(
        feeds,
        Arc::new(scraper),
        cfg.mapping(),
        feed_cache.clone(),
        cfg.pipeline(),
        cfg.channel(),
    );

    Harness {
        aggregator: Arc::new(aggregator),
        health: Arc::new(HealthState::new()),
        feed_cache,
        article_cache,
    }
}
