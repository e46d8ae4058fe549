// src/ingest/types.rs
use chrono::{DateTime, Utc};

/// A per-topic feed discovered on the wire feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub title: String,
    pub url: String,
}

/// Article metadata read from a topic feed, optionally enriched with the
/// scraped body. Never mutated once pooled; see [`FeedItem::enriched`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: DateTime<Utc>,
    pub guid: String,
    /// Wire topic title the item was read from.
    pub source_category: String,
    /// Output categories, computed once at ingestion.
    pub mapped_categories: Vec<String>,
    pub content: String,
    pub featured_image: Option<String>,
}

impl FeedItem {
    /// Copy of this item with the scraped body and image filled in.
    pub fn enriched(&self, content: String, featured_image: Option<String>) -> Self {
        Self {
            content,
            featured_image,
            ..self.clone()
        }
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.mapped_categories.iter().any(|c| c == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeedItem {
        FeedItem {
            title: "t".into(),
            link: "https://x/a".into(),
            description: "d".into(),
            pub_date: Utc::now(),
            guid: "g".into(),
            source_category: "Sportas".into(),
            mapped_categories: vec!["Sportas".into()],
            content: String::new(),
            featured_image: None,
        }
    }

    #[test]
    fn enriched_leaves_original_untouched() {
        let base = sample();
        let rich = base.enriched("<p>x</p>".into(), Some("https://x/i.jpg".into()));

        assert!(base.content.is_empty());
        assert!(base.featured_image.is_none());
        assert_eq!(rich.content, "<p>x</p>");
        assert_eq!(rich.guid, base.guid);
        assert_eq!(rich.mapped_categories, base.mapped_categories);
    }

    #[test]
    fn category_membership() {
        let it = sample();
        assert!(it.in_category("Sportas"));
        assert!(!it.in_category("sportas"));
    }
}
