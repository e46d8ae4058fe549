//! # Aggregator
//! Builds the per-category output feeds from the wire.
//!
//! Selection runs in a fixed order:
//! 1. dedup by guid (first topic in discovery order wins),
//! 2. recency cap (newest `max_items`),
//! 3. round-robin across source categories, up to `max_items`,
//! 4. enrichment through the article scraper (items without paragraphs are dropped),
//! 5. final newest-first sort,
//! 6. per-category filter + render.
//!
//! Topic failures are logged and skipped. Scrape failures abort the build.

pub mod render;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::cache::{CacheKeys, TtlCache};
use crate::categories::CategoryMapping;
use crate::ingest::{self, fetch::Fetcher, types::FeedItem};
use crate::scrape::ArticleScraper;

pub use render::{render_feed, ChannelInfo};

static RE_DESC_IMG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img\s+src="([^"]+)""#).expect("description img regex"));

/// Knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub feed_url: String,
    pub max_items: usize,
    /// Topic titles containing any of these are never read.
    pub excluded_topics: Vec<String>,
    /// Lifetime of a rendered document in the cache.
    pub feed_ttl: Duration,
}

pub struct Aggregator {
    feed_fetcher: Arc<dyn Fetcher>,
    scraper: Arc<ArticleScraper>,
    mapping: CategoryMapping,
    feed_cache: Arc<TtlCache<String, String>>,
    settings: PipelineSettings,
    channel: ChannelInfo,
}

impl Aggregator {
    pub fn new(
        feed_fetcher: Arc<dyn Fetcher>,
        scraper: Arc<ArticleScraper>,
        mapping: CategoryMapping,
        feed_cache: Arc<TtlCache<String, String>>,
        settings: PipelineSettings,
        channel: ChannelInfo,
    ) -> Self {
        Self {
            feed_fetcher,
            scraper,
            mapping,
            feed_cache,
            settings,
            channel,
        }
    }

    pub fn categories(&self) -> Vec<String> {
        self.mapping.all_categories()
    }

    pub fn mapping(&self) -> &CategoryMapping {
        &self.mapping
    }

    /// Evict expired documents and articles. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.feed_cache.purge_expired() + self.scraper.purge_expired()
    }

    /// True if at least one category document is cached and live.
    pub fn has_cached_feed(&self) -> bool {
        self.feed_cache
            .any_live_key(|k| k.starts_with(CacheKeys::FEED_PREFIX))
    }

    /// Read path: cached document, or a synchronous rebuild on a miss.
    /// Concurrent misses may rebuild twice; the last write wins.
    pub async fn cached_feed(&self, category: &str) -> Result<String> {
        let key = CacheKeys::feed(category);
        if let Some(xml) = self.feed_cache.get(&key) {
            counter!("feed_cache_hits_total").increment(1);
            return Ok(xml);
        }

        let xml = self.build_feed(category).await?;
        self.feed_cache
            .insert(key, xml.clone(), self.settings.feed_ttl);
        Ok(xml)
    }

    /// Rebuild `category` and overwrite its cache entry.
    pub async fn refresh_category(&self, category: &str) -> Result<()> {
        let xml = self.build_feed(category).await?;
        self.feed_cache
            .insert(CacheKeys::feed(category), xml, self.settings.feed_ttl);
        Ok(())
    }

    /// Run the whole pipeline and render the document for `category`.
    pub async fn build_feed(&self, category: &str) -> Result<String> {
        counter!("feed_rebuilds_total").increment(1);
        let items = self.build_items().await?;
        let selected: Vec<&FeedItem> = items.iter().filter(|i| i.in_category(category)).collect();
        info!(
            target: "aggregate",
            category,
            total = items.len(),
            in_category = selected.len(),
            "feed built"
        );
        render_feed(&self.channel, category, &selected, Utc::now())
            .with_context(|| format!("rendering feed '{category}'"))
    }

    /// Steps 1–5: the final, enriched, newest-first item list.
    pub async fn build_items(&self) -> Result<Vec<FeedItem>> {
        let pool = self.collect_pool().await?;
        let selected = select_items(pool, self.settings.max_items);
        let mut enriched = self.enrich(selected).await?;
        order_newest_first(&mut enriched);
        Ok(enriched)
    }

    /// Discover topics and ingest every non-excluded one. A failing topic is
    /// logged and skipped; a failing wire feed is an error.
    pub async fn collect_pool(&self) -> Result<Vec<FeedItem>> {
        let topics = ingest::read_topics(self.feed_fetcher.as_ref(), &self.settings.feed_url)
            .await
            .context("reading topics")?;

        let mut pool = Vec::new();
        for topic in topics {
            if is_excluded(&topic.title, &self.settings.excluded_topics) {
                debug!(target: "aggregate", topic = %topic.title, "topic excluded");
                continue;
            }

            match ingest::read_topic_items(self.feed_fetcher.as_ref(), &topic, &self.mapping).await
            {
                Ok(mut items) => {
                    counter!("topics_fetched_total").increment(1);
                    pool.append(&mut items);
                }
                Err(e) => {
                    counter!("topic_errors_total").increment(1);
                    warn!(target: "aggregate", topic = %topic.title, error = ?e, "topic skipped");
                }
            }
        }
        Ok(pool)
    }

    /// Step 4. Items whose scraped body has no paragraph are dropped.
    /// The first scrape error aborts the remaining items.
    pub async fn enrich(&self, selected: Vec<FeedItem>) -> Result<Vec<FeedItem>> {
        let mut out = Vec::with_capacity(selected.len());
        for item in &selected {
            let scraped = self.scraper.scrape(&item.link, &item.guid).await?;
            if !scraped.has_paragraphs() {
                debug!(target: "aggregate", guid = %item.guid, "no paragraphs, dropped");
                continue;
            }

            let image = scraped
                .featured_image
                .or_else(|| featured_from_description(&item.description));
            out.push(item.enriched(scraped.content, image));
        }
        Ok(out)
    }
}

/// Substring match against the exclusion list.
pub fn is_excluded(title: &str, excluded: &[String]) -> bool {
    excluded.iter().any(|e| !e.is_empty() && title.contains(e.as_str()))
}

/// Steps 1–3 over a pooled item list.
pub fn select_items(pool: Vec<FeedItem>, max_items: usize) -> Vec<FeedItem> {
    let deduped = dedup_by_guid(pool);
    let recent = cap_recent(deduped, max_items);
    balance_round_robin(recent, max_items)
}

/// Keep the first item seen for every guid, preserving order.
pub fn dedup_by_guid(items: Vec<FeedItem>) -> Vec<FeedItem> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|it| seen.insert(it.guid.clone()))
        .collect()
}

/// Newest `n` items, newest first. Ties keep their pool order.
pub fn cap_recent(mut items: Vec<FeedItem>, n: usize) -> Vec<FeedItem> {
    order_newest_first(&mut items);
    items.truncate(n);
    items
}

/// Interleave source-category groups (ordered by first appearance, each
/// newest first): round r takes item r of every group that still has one.
/// Stops at `n` items or when a round adds nothing.
pub fn balance_round_robin(items: Vec<FeedItem>, n: usize) -> Vec<FeedItem> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<FeedItem>> = HashMap::new();
    for it in items {
        if !groups.contains_key(&it.source_category) {
            order.push(it.source_category.clone());
        }
        groups.entry(it.source_category.clone()).or_default().push(it);
    }

    let mut columns: Vec<std::vec::IntoIter<FeedItem>> = order
        .iter()
        .filter_map(|cat| groups.remove(cat))
        .map(|mut g| {
            order_newest_first(&mut g);
            g.into_iter()
        })
        .collect();

    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let mut added = false;
        for col in columns.iter_mut() {
            if out.len() == n {
                break;
            }
            if let Some(it) = col.next() {
                out.push(it);
                added = true;
            }
        }
        if !added {
            break;
        }
    }
    out
}

/// Stable sort, newest first.
pub fn order_newest_first(items: &mut [FeedItem]) {
    items.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
}

/// First `<img src="…">` in an item description.
pub fn featured_from_description(description: &str) -> Option<String> {
    if description.trim().is_empty() {
        return None;
    }
    RE_DESC_IMG
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
