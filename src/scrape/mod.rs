// src/scrape/mod.rs
//! Article scraper: rate-limited page fetch → sanitizer → 7-day cache.

pub mod limiter;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::counter;
use tracing::debug;

use crate::cache::{CacheKeys, TtlCache};
use crate::ingest::fetch::Fetcher;
use crate::sanitize::ContentSanitizer;
use crate::scrape::limiter::RateLimiter;

pub const DEFAULT_ARTICLE_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Sanitized body and featured image of one article page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedArticle {
    pub content: String,
    pub featured_image: Option<String>,
}

impl ScrapedArticle {
    /// True when the body holds at least one paragraph.
    pub fn has_paragraphs(&self) -> bool {
        self.content.contains("<p>")
    }
}

pub struct ArticleScraper {
    fetcher: Arc<dyn Fetcher>,
    limiter: Arc<RateLimiter>,
    cache: Arc<TtlCache<String, ScrapedArticle>>,
    sanitizer: ContentSanitizer,
    ttl: Duration,
}

impl ArticleScraper {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        limiter: Arc<RateLimiter>,
        cache: Arc<TtlCache<String, ScrapedArticle>>,
        sanitizer: ContentSanitizer,
    ) -> Self {
        Self {
            fetcher,
            limiter,
            cache,
            sanitizer,
            ttl: DEFAULT_ARTICLE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Drop expired articles; guids that leave the wire are never read again.
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    /// Scrape `url`, cached under `guid`.
    ///
    /// A blank url returns an empty article without touching the network or
    /// the cache. Cache hits skip the rate limiter. Fetch errors propagate.
    pub async fn scrape(&self, url: &str, guid: &str) -> Result<ScrapedArticle> {
        if url.trim().is_empty() {
            return Ok(ScrapedArticle::default());
        }

        let key = CacheKeys::article(guid);
        if let Some(hit) = self.cache.get(&key) {
            counter!("scrape_cache_hits_total").increment(1);
            debug!(target: "scrape", guid, "article cache hit");
            return Ok(hit);
        }

        let html = {
            let _slot = self.limiter.acquire().await?;
            counter!("scrape_fetches_total").increment(1);
            debug!(target: "scrape", url, "fetching article");
            self.fetcher
                .fetch_text(url)
                .await
                .with_context(|| format!("scraping article {url}"))?
        };

        let article = ScrapedArticle {
            content: self.sanitizer.sanitize(&html),
            featured_image: self.sanitizer.featured_image(&html),
        };
        self.cache.insert(key, article.clone(), self.ttl);
        Ok(article)
    }
}
