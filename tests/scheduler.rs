// tests/scheduler.rs
mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use wire_digest::cache::CacheKeys;
use wire_digest::ingest::fetch::Fetcher;
use wire_digest::scheduler::{run_tick, spawn_refresh_loop};
use wire_digest::scrape::ScrapedArticle;

use common::*;

/// Wire feed that is down until `up` is set.
struct Flaky {
    up: AtomicBool,
    inner: MockFetcher,
}

#[async_trait]
impl Fetcher for Flaky {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        if url == WIRE_URL && !self.up.load(Ordering::SeqCst) {
            anyhow::bail!("GET {url}: 503");
        }
        self.inner.fetch_text(url).await
    }
}

/// Wire feed that answers `budget` times and then goes down.
struct WireBudget {
    budget: AtomicUsize,
    inner: MockFetcher,
}

#[async_trait]
impl Fetcher for WireBudget {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        if url == WIRE_URL {
            let spent = self
                .budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if spent.is_err() {
                anyhow::bail!("GET {url}: 503");
            }
        }
        self.inner.fetch_text(url).await
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(60), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition reached");
}

#[tokio::test]
async fn tick_refreshes_every_category() {
    let (state, _, _) = fixture_state();
    let n = run_tick(&state.aggregator, &state.health).await.unwrap();

    assert_eq!(n, state.aggregator.categories().len());
    assert!(state.health.last_refresh().is_some());
    assert!(state.aggregator.has_cached_feed());
    for category in state.aggregator.categories() {
        let xml = state.aggregator.cached_feed(&category).await.unwrap();
        assert!(xml.contains(&format!("<title>{category}</title>")));
    }
}

#[tokio::test]
async fn failed_tick_keeps_timestamp_and_cache_untouched() {
    let feeds = Arc::new(MockFetcher::new().with_failure(WIRE_URL, "down"));
    let state = state_with(&test_config(), feeds, Arc::new(article_fetcher()));

    let err = run_tick(&state.aggregator, &state.health).await.unwrap_err();
    // first category in table order
    assert!(format!("{err:#}").contains("Aktualijos"));
    assert!(state.health.last_refresh().is_none());
    assert!(!state.aggregator.has_cached_feed());
}

#[tokio::test]
async fn loop_survives_a_failed_tick_and_rearms() {
    tokio::time::pause();

    let flaky = Arc::new(Flaky {
        up: AtomicBool::new(false),
        inner: feed_fetcher(),
    });
    let state = state_with(&test_config(), flaky.clone(), Arc::new(article_fetcher()));
    let interval = Duration::from_secs(4 * 3600);

    let handle = spawn_refresh_loop(state.aggregator.clone(), state.health.clone(), interval);

    // first tick fails immediately
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(state.health.last_refresh().is_none());
    assert!(!handle.is_finished());

    // wire recovers; next tick after the interval succeeds
    flaky.up.store(true, Ordering::SeqCst);
    tokio::time::sleep(interval).await;
    let health = state.health.clone();
    wait_until(move || health.last_refresh().is_some()).await;

    assert!(state.aggregator.has_cached_feed());
    assert!(!handle.is_finished());
    handle.abort();
}

#[tokio::test]
async fn mid_tick_failure_keeps_later_categories_stale() {
    let feeds = Arc::new(WireBudget {
        budget: AtomicUsize::new(2),
        inner: feed_fetcher(),
    });
    let h = harness(feeds, Arc::new(article_fetcher()), Duration::from_secs(24 * 3600));
    let categories = h.aggregator.categories();
    for category in &categories {
        h.feed_cache
            .insert(CacheKeys::feed(category), "stale".to_string(), Duration::from_secs(3600));
    }
    let before = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
    h.health.mark_refreshed(before);

    let err = run_tick(&h.aggregator, &h.health).await.unwrap_err();

    // one wire fetch per category: the third in table order fails
    assert!(format!("{err:#}").contains(&categories[2]), "{err:#}");
    for category in &categories[..2] {
        let xml = h.feed_cache.get(&CacheKeys::feed(category)).unwrap();
        assert!(xml.contains(&format!("<title>{category}</title>")), "{category}");
    }
    for category in &categories[2..] {
        let xml = h.feed_cache.get(&CacheKeys::feed(category)).unwrap();
        assert_eq!(xml, "stale", "{category}");
    }
    assert_eq!(h.health.last_refresh(), Some(before));
}

#[tokio::test(start_paused = true)]
async fn tick_purges_entries_past_their_ttl() {
    let h = harness(
        Arc::new(feed_fetcher()),
        Arc::new(article_fetcher()),
        Duration::from_secs(7 * 24 * 3600),
    );
    let short = Duration::from_secs(3600);
    h.feed_cache
        .insert(CacheKeys::feed("Retired"), "old".to_string(), short);
    h.article_cache
        .insert(CacheKeys::article("retired"), ScrapedArticle::default(), short);

    run_tick(&h.aggregator, &h.health).await.unwrap();
    let categories = h.aggregator.categories().len();
    let articles = h.article_cache.len();
    assert_eq!(h.feed_cache.len(), categories + 1);
    assert!(articles > 1);

    // past the short TTL, well inside the feed and article TTLs
    tokio::time::advance(Duration::from_secs(2 * 3600)).await;
    run_tick(&h.aggregator, &h.health).await.unwrap();

    assert_eq!(h.feed_cache.len(), categories);
    assert_eq!(h.article_cache.len(), articles - 1);
    assert!(h.article_cache.get(&CacheKeys::article("retired")).is_none());
}
