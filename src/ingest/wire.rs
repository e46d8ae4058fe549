// src/ingest/wire.rs
//! RSS wire format: entity scrubbing, permissive item parsing and pubDate
//! handling. The wire feed and every topic feed share this schema.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RawItem>,
}

/// `<guid>` may carry `isPermaLink`; only its text matters.
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawItemXml {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    guid: Option<TextNode>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// One `<item>` as it appears on the wire, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawItemXml")]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub guid: Option<String>,
    pub pub_date: Option<String>,
}

impl From<RawItemXml> for RawItem {
    fn from(x: RawItemXml) -> Self {
        Self {
            title: x.title,
            link: x.link,
            description: x.description,
            guid: x.guid.map(|g| g.value),
            pub_date: x.pub_date,
        }
    }
}

/// Replace the HTML-only entities the wire emits with literal characters,
/// so the document parses as strict XML.
pub fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", "\u{00A0}")
        .replace("&laquo;", "«")
        .replace("&raquo;", "»")
}

/// Parse an RSS document into its raw items, in document order.
/// No DTD is fetched and no external entity is resolved.
pub fn parse_items(xml: &str) -> Result<Vec<RawItem>> {
    if xml.trim().is_empty() {
        return Ok(Vec::new());
    }
    let clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&clean).context("parsing rss xml")?;
    Ok(rss.channel.item)
}

/// Wire dates look like `Tue, 14 Oct 2025 09:15:00 +0300`.
/// Returns `None` when the value cannot be read.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc2822) {
        return DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), dt.nanosecond());
    }

    // `+03:00` style offsets and `GMT` suffixes
    DateTime::parse_from_str(raw, "%a, %d %b %Y %H:%M:%S %:z")
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_hhmm_offset() {
        let dt = parse_pub_date("Tue, 14 Oct 2025 09:15:00 +0300").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 10, 14, 6, 15, 0).unwrap());
    }

    #[test]
    fn parses_colon_offset_and_gmt() {
        let a = parse_pub_date("Tue, 14 Oct 2025 09:15:00 +03:00").unwrap();
        assert_eq!(a, Utc.with_ymd_and_hms(2025, 10, 14, 6, 15, 0).unwrap());
        let b = parse_pub_date("Tue, 14 Oct 2025 06:15:00 GMT").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn garbage_dates_are_none() {
        assert!(parse_pub_date("").is_none());
        assert!(parse_pub_date("yesterday-ish").is_none());
        assert!(parse_pub_date("2025-10-14").is_none());
    }

    #[test]
    fn scrub_replaces_only_known_entities() {
        let s = scrub_html_entities_for_xml("a&nbsp;b &laquo;q&raquo; &amp; &mdash;");
        assert_eq!(s, "a\u{00A0}b «q» &amp; &mdash;");
    }

    #[test]
    fn reads_items_with_cdata_and_guid_attributes() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>t</title>
    <atom:link href="https://x/rss" rel="self"/>
    <item>
      <title>Pirmas&nbsp;&laquo;A&raquo;</title>
      <link> https://x/a </link>
      <description><![CDATA[<img src="https://x/a.jpg" alt="" />Tekstas]]></description>
      <guid isPermaLink="false">g-1</guid>
      <pubDate>Tue, 14 Oct 2025 09:15:00 +0300</pubDate>
    </item>
    <item>
      <title>Antras</title>
      <link>https://x/b</link>
    </item>
  </channel>
</rss>"#;
        let items = parse_items(xml).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].guid.as_deref(), Some("g-1"));
        assert!(items[0].title.as_deref().unwrap().contains("«A»"));
        assert!(items[0]
            .description
            .as_deref()
            .unwrap()
            .starts_with("<img src=\"https://x/a.jpg\""));
        assert!(items[1].guid.is_none());
        assert!(items[1].pub_date.is_none());
    }

    #[test]
    fn empty_document_has_no_items() {
        assert!(parse_items("   ").unwrap().is_empty());
    }

    #[test]
    fn broken_xml_is_an_error() {
        assert!(parse_items("<rss><channel><item><title>x</item>").is_err());
    }
}
