// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod categories;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod sanitize;
pub mod scheduler;
pub mod scrape;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::aggregate::Aggregator;
use crate::api::AppState;
use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::ingest::fetch::{Fetcher, HttpFetcher};
use crate::sanitize::ContentSanitizer;
use crate::scheduler::HealthState;
use crate::scrape::{limiter::RateLimiter, ArticleScraper};

pub use crate::api::create_router;

/// Wire every component from `cfg` around the given fetchers.
/// Feed and article fetches use separate clients so each keeps its own timeout.
pub fn build_state(
    cfg: &AppConfig,
    feed_fetcher: Arc<dyn Fetcher>,
    article_fetcher: Arc<dyn Fetcher>,
) -> Result<AppState> {
    let sanitizer = ContentSanitizer::new(&cfg.sanitizer)?;
    let scraper = ArticleScraper::new(
        article_fetcher,
        Arc::new(RateLimiter::new(cfg.limiter)),
        Arc::new(TtlCache::new()),
        sanitizer,
    )
    .with_ttl(cfg.article_ttl());

    let aggregator = Aggregator::new(
        feed_fetcher,
        Arc::new(scraper),
        cfg.mapping(),
        Arc::new(TtlCache::new()),
        cfg.pipeline(),
        cfg.channel(),
    );

    Ok(AppState {
        aggregator: Arc::new(aggregator),
        health: Arc::new(HealthState::new()),
    })
}

/// Production wiring: reqwest clients with the configured timeouts.
pub fn build_http_state(cfg: &AppConfig) -> Result<AppState> {
    let ua = Some(cfg.user_agent.as_str());
    let feed = HttpFetcher::new(Duration::from_secs(cfg.feed_timeout_secs), ua)?;
    let article = HttpFetcher::new(Duration::from_secs(cfg.article_timeout_secs), ua)?;
    build_state(cfg, Arc::new(feed), Arc::new(article))
}
