// src/ingest/mod.rs
//! Topic discovery on the wire feed and per-topic item ingestion.
//! Both propagate fetch/parse failures; the aggregator decides what to skip.

pub mod fetch;
pub mod types;
pub mod wire;

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::counter;
use uuid::Uuid;

use crate::categories::CategoryMapping;
use crate::ingest::fetch::Fetcher;
use crate::ingest::types::{FeedItem, Topic};
use crate::ingest::wire::{parse_items, parse_pub_date, RawItem};

/// Read the wire feed and return its topic feeds in feed order.
/// Only links ending in `/rss` (any case) are topic feeds.
pub async fn read_topics(fetcher: &dyn Fetcher, wire_url: &str) -> Result<Vec<Topic>> {
    let xml = fetcher
        .fetch_text(wire_url)
        .await
        .context("fetching wire feed")?;
    let items = parse_items(&xml).with_context(|| format!("parsing wire feed {wire_url}"))?;
    Ok(topics_from_items(items))
}

fn topics_from_items(items: Vec<RawItem>) -> Vec<Topic> {
    items
        .into_iter()
        .map(|it| Topic {
            title: it.title.unwrap_or_default().trim().to_string(),
            url: it.link.unwrap_or_default().trim().to_string(),
        })
        .filter(|t| !t.url.is_empty() && t.url.to_ascii_lowercase().ends_with("/rss"))
        .collect()
}

/// Fetch one topic feed and turn its items into [`FeedItem`]s.
pub async fn read_topic_items(
    fetcher: &dyn Fetcher,
    topic: &Topic,
    mapping: &CategoryMapping,
) -> Result<Vec<FeedItem>> {
    let xml = fetcher
        .fetch_text(&topic.url)
        .await
        .with_context(|| format!("fetching topic feed '{}'", topic.title))?;
    let raw = parse_items(&xml).with_context(|| format!("parsing topic feed {}", topic.url))?;

    let items = items_from_raw(raw, topic, mapping);
    counter!("items_ingested_total").increment(items.len() as u64);
    Ok(items)
}

/// Interpret raw wire items for `topic`. Dates that cannot be read fall back
/// to now; missing guids get a fresh random token.
pub fn items_from_raw(raw: Vec<RawItem>, topic: &Topic, mapping: &CategoryMapping) -> Vec<FeedItem> {
    if raw.is_empty() {
        return Vec::new();
    }

    // One lookup per topic; every item of the topic shares the result.
    let mapped = mapping.map_topic(&topic.title);
    if mapped.is_empty() {
        counter!("items_unmapped_total").increment(raw.len() as u64);
    }

    raw.into_iter()
        .map(|it| {
            let pub_date = it
                .pub_date
                .as_deref()
                .and_then(parse_pub_date)
                .unwrap_or_else(Utc::now);
            let guid = it
                .guid
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            FeedItem {
                title: it.title.unwrap_or_default().trim().to_string(),
                link: it.link.unwrap_or_default().trim().to_string(),
                description: it.description.unwrap_or_default().trim().to_string(),
                pub_date,
                guid,
                source_category: topic.title.clone(),
                mapped_categories: mapped.clone(),
                content: String::new(),
                featured_image: None,
            }
        })
        .collect()
}
