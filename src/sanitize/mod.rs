//! # Content Sanitizer
//! Whitelist HTML → HTML transform for scraped article pages.
//!
//! - Pass A walks the *direct* children of the article body container and
//!   re-emits only paragraphs, h1–h3, blockquotes, figures and lists, with
//!   inline content cleaned by [`inline::clean_inline`].
//! - Pass B reparses Pass A's output and removes any `<script>`/`<style>`
//!   that surfaced from decoded text.
//! - The featured image is read from the *original* page (hero figure).
//!
//! Pure functions of the input document; no I/O.

pub mod inline;

use anyhow::{anyhow, Result};
use html_escape::{encode_double_quoted_attribute, encode_text};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

pub use inline::clean_inline;

/// Class markers that locate the body container and the hero figure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub body_class: String,
    pub hero_class: String,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            body_class: "sc-item-body".to_string(),
            hero_class: "sc-item-logo".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentSanitizer {
    body: Selector,
    hero_img: Selector,
    img: Selector,
    figcaption: Selector,
    script_style: Selector,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector `{css}`: {e}"))
}

impl ContentSanitizer {
    pub fn new(cfg: &SanitizerConfig) -> Result<Self> {
        Ok(Self {
            // class substring match: `sc-item-body` also hits `sc-item-body-inner`
            body: selector(&format!("div[class*=\"{}\"]", cfg.body_class))?,
            hero_img: selector(&format!("figure[class*=\"{}\"] img", cfg.hero_class))?,
            img: selector("img")?,
            figcaption: selector("figcaption")?,
            script_style: selector("script, style")?,
        })
    }

    /// Full body cleanup: Pass A then Pass B.
    pub fn sanitize(&self, html: &str) -> String {
        let extracted = self.extract_body(html);
        self.strip_unsafe(&extracted)
    }

    /// Pass A: structural extraction of the body container.
    pub fn extract_body(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }

        let doc = Html::parse_document(html);
        let Some(body) = doc.select(&self.body).next() else {
            return String::new();
        };

        let mut lines: Vec<String> = Vec::new();
        for node in body.children().filter_map(ElementRef::wrap) {
            match node.value().name() {
                "p" => {
                    let text = clean_inline(node);
                    if !text.is_empty() {
                        lines.push(format!("<p>{text}</p>"));
                    }
                }
                tag @ ("h1" | "h2" | "h3") => {
                    lines.push(format!("<{tag}>{}</{tag}>", clean_inline(node)));
                }
                "blockquote" => {
                    lines.push(format!("<blockquote>{}</blockquote>", clean_inline(node)));
                }
                "figure" => self.append_figure(node, &mut lines),
                tag @ ("ul" | "ol") => self.append_list(tag, node, &mut lines),
                _ => {}
            }
        }

        lines.join("\n").trim().to_string()
    }

    fn append_figure(&self, figure: ElementRef<'_>, lines: &mut Vec<String>) {
        let Some(src) = figure
            .select(&self.img)
            .next()
            .and_then(|img| img.value().attr("src"))
            .filter(|s| !s.trim().is_empty())
        else {
            return;
        };

        lines.push("<figure>".to_string());
        lines.push(format!(
            "<img src=\"{}\" alt=\"\" />",
            encode_double_quoted_attribute(src)
        ));
        if let Some(caption) = figure.select(&self.figcaption).next() {
            let text: String = caption.text().collect();
            lines.push(format!("<figcaption>{}</figcaption>", encode_text(text.trim())));
        }
        lines.push("</figure>".to_string());
    }

    fn append_list(&self, tag: &str, list: ElementRef<'_>, lines: &mut Vec<String>) {
        lines.push(format!("<{tag}>"));
        let items = list
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| c.value().name() == "li");
        for li in items {
            let text = clean_inline(li);
            if !text.is_empty() {
                lines.push(format!("<li>{text}</li>"));
            }
        }
        lines.push(format!("</{tag}>"));
    }

    /// Pass B: reparse and drop `<script>`/`<style>`, return inner markup.
    pub fn strip_unsafe(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }

        let mut doc = Html::parse_fragment(html);
        let doomed: Vec<_> = doc.select(&self.script_style).map(|el| el.id()).collect();
        for id in doomed {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
        }

        doc.root_element().inner_html().trim().to_string()
    }

    /// `src` of the image inside the page's hero figure, read from the
    /// unsanitized page.
    pub fn featured_image(&self, html: &str) -> Option<String> {
        if html.trim().is_empty() {
            return None;
        }
        let doc = Html::parse_document(html);
        doc.select(&self.hero_img)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}
