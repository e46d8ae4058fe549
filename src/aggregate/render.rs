// src/aggregate/render.rs
//! RSS 2.0 output with the content/dc/atom/media namespaces, shaped for
//! publishing-platform import.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Deserialize;

use crate::ingest::types::FeedItem;

/// Channel-level metadata shared by every category document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelInfo {
    pub site_link: String,
    pub language: String,
    /// Base of the self link; the lowercased category is appended.
    pub public_base_url: String,
}

impl Default for ChannelInfo {
    fn default() -> Self {
        Self {
            site_link: "https://sc.bns.lt".to_string(),
            language: "lt".to_string(),
            public_base_url: "http://localhost:8000".to_string(),
        }
    }
}

/// RFC 1123 timestamp, always in GMT.
pub fn rfc1123(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// CDATA section bodies for `s`. An embedded `]]>` is split across two
/// sections so the terminator never appears inside one.
pub fn cdata_parts(s: &str) -> Vec<String> {
    let pieces: Vec<&str> = s.split("]]>").collect();
    let last = pieces.len() - 1;
    pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            let mut part = String::with_capacity(piece.len() + 3);
            if i > 0 {
                part.push('>');
            }
            part.push_str(piece);
            if i < last {
                part.push_str("]]");
            }
            part
        })
        .collect()
}

/// `image/<ext>` from the last path segment of `url`, lowercased,
/// `jpg` → `jpeg`. Falls back to `image/jpeg` when there is no extension.
pub fn image_media_type(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(u) => u.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let last = path.rsplit('/').next().unwrap_or_default();
    let ext = match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "jpeg".to_string(),
    };

    match ext.as_str() {
        "jpg" => "image/jpeg".to_string(),
        other => format!("image/{other}"),
    }
}

const NAMESPACES: [(&str, &str); 5] = [
    ("version", "2.0"),
    ("xmlns:content", "http://purl.org/rss/1.0/modules/content/"),
    ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
    ("xmlns:atom", "http://www.w3.org/2005/Atom"),
    ("xmlns:media", "http://search.yahoo.com/mrss/"),
];

type XmlWriter = Writer<Vec<u8>>;

fn newline(w: &mut XmlWriter) -> Result<()> {
    w.write_event(Event::Text(BytesText::new("\n")))?;
    Ok(())
}

fn text_element(w: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    newline(w)
}

fn cdata_element(w: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    for part in cdata_parts(text) {
        w.write_event(Event::CData(BytesCData::new(part)))?;
    }
    w.write_event(Event::End(BytesEnd::new(name)))?;
    newline(w)
}

/// Render the document for `category` from already filtered, ordered items.
pub fn render_feed(
    channel: &ChannelInfo,
    category: &str,
    items: &[&FeedItem],
    now: DateTime<Utc>,
) -> Result<String> {
    let mut w = Writer::new(Vec::with_capacity(1024 + items.len() * 2048));
    let self_link = format!(
        "{}/{}",
        channel.public_base_url.trim_end_matches('/'),
        category.to_lowercase()
    );

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    newline(&mut w)?;

    let mut rss = BytesStart::new("rss");
    for attr in NAMESPACES {
        rss.push_attribute(attr);
    }
    w.write_event(Event::Start(rss))?;
    newline(&mut w)?;
    w.write_event(Event::Start(BytesStart::new("channel")))?;
    newline(&mut w)?;

    text_element(&mut w, "title", category)?;
    text_element(&mut w, "link", &channel.site_link)?;
    text_element(&mut w, "description", category)?;
    text_element(&mut w, "lastBuildDate", &rfc1123(&now))?;
    text_element(&mut w, "language", &channel.language)?;

    let mut atom = BytesStart::new("atom:link");
    atom.push_attribute(("href", self_link.as_str()));
    atom.push_attribute(("rel", "self"));
    atom.push_attribute(("type", "application/rss+xml"));
    w.write_event(Event::Empty(atom))?;
    newline(&mut w)?;

    for item in items {
        write_item(&mut w, item).with_context(|| format!("rendering item {}", item.guid))?;
    }

    w.write_event(Event::End(BytesEnd::new("channel")))?;
    newline(&mut w)?;
    w.write_event(Event::End(BytesEnd::new("rss")))?;
    newline(&mut w)?;

    String::from_utf8(w.into_inner()).context("rendered feed is not UTF-8")
}

fn write_item(w: &mut XmlWriter, item: &FeedItem) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new("item")))?;
    newline(w)?;

    cdata_element(w, "title", &item.title)?;
    text_element(w, "link", &item.link)?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "false"));
    w.write_event(Event::Start(guid))?;
    w.write_event(Event::Text(BytesText::new(&item.guid)))?;
    w.write_event(Event::End(BytesEnd::new("guid")))?;
    newline(w)?;

    text_element(w, "pubDate", &rfc1123(&item.pub_date))?;
    for cat in &item.mapped_categories {
        cdata_element(w, "category", cat)?;
    }
    cdata_element(w, "description", &item.description)?;
    cdata_element(w, "content:encoded", &item.content)?;

    if let Some(img) = item.featured_image.as_deref().filter(|s| !s.is_empty()) {
        let media_type = image_media_type(img);
        let mut enclosure = BytesStart::new("enclosure");
        enclosure.push_attribute(("url", img));
        enclosure.push_attribute(("length", "0"));
        enclosure.push_attribute(("type", media_type.as_str()));
        w.write_event(Event::Empty(enclosure))?;
        newline(w)?;
    }

    w.write_event(Event::End(BytesEnd::new("item")))?;
    newline(w)
}
