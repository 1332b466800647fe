//! HTML to [`Document`] conversion.
//!
//! Extracts the title, readable text blocks and every anchor using `scraper`.
//! Link targets are resolved against the page URL with `url`.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::core::document::{Document, Link};

const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, pre, blockquote, dt, dd, figcaption";
const MAX_BLOCKS: usize = 2_000;

/// Parse an HTML page fetched from `url`.
pub fn parse_document(html: &str, url: &str) -> Document {
    let doc = Html::parse_document(html);
    let base = Url::parse(url).ok();

    Document {
        url: url.to_string(),
        title: extract_title(&doc),
        blocks: extract_blocks(&doc),
        links: extract_links(&doc, base.as_ref()),
        error: None,
    }
}

/// Wraps a non-HTML body as a single preformatted block.
pub fn plain_document(text: &str, url: &str) -> Document {
    Document {
        url: url.to_string(),
        title: String::new(),
        blocks: text
            .split("\n\n")
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect(),
        links: Vec::new(),
        error: None,
    }
}

fn extract_title(doc: &Html) -> String {
    // Priority: <title> → <h1>
    for selector in ["title", "h1"] {
        if let Some(el) = Selector::parse(selector)
            .ok()
            .and_then(|s| doc.select(&s).next())
        {
            let text = collapse_whitespace(&element_text(el));
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

fn extract_blocks(doc: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse(BLOCK_SELECTOR) else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter(|el| !has_block_ancestor(*el))
        .map(|el| {
            if el.value().name() == "pre" {
                element_text(el).trim_end().to_string()
            } else {
                collapse_whitespace(&element_text(el))
            }
        })
        .filter(|text| !text.is_empty())
        .take(MAX_BLOCKS)
        .collect()
}

/// True when a block element sits inside another block we already emit.
fn has_block_ancestor(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| matches!(a.value().name(), "p" | "li" | "pre" | "blockquote" | "dd"))
}

fn extract_links(doc: &Html, base: Option<&Url>) -> Vec<Link> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    doc.select(&selector)
        .map(|el| {
            let attrs = el.value();
            let href = attrs.attr("href").unwrap_or_default().to_string();
            Link {
                text: collapse_whitespace(&element_text(el)),
                url: resolve(base, &href),
                href,
                target: attrs.attr("target").map(str::to_string),
                rel: attrs.attr("rel").map(str::to_string),
            }
        })
        .collect()
}

fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let joined = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    Some(joined.to_string())
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
