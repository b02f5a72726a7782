//! HTML segment codec.
//!
//! The page is parsed into a DOM and walked in document order. Leaf block
//! elements become text segments carrying their inner HTML (inline tags
//! included); a few human-facing attributes become attribute segments.
//! Writing back re-parses the original page and substitutes sanitized
//! translations in place, leaving everything else as it was.

use std::collections::BTreeMap;

use ammonia::{Builder, UrlRelative};
use kuchiki::{ElementData, NodeRef, traits::TendrilSink};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "td", "th", "dt", "dd", "blockquote",
    "figcaption", "caption", "label", "button", "summary", "legend", "option", "section",
    "article", "header", "footer", "nav", "aside", "main", "title",
];

const SKIP_TAGS: &[&str] = &[
    "script", "style", "svg", "pre", "code", "noscript", "template",
];

const TRANSLATABLE_ATTRIBUTES: &[&str] = &["alt", "title", "placeholder", "aria-label"];

/// Tags a translated segment may contain.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "em", "i", "kbd", "mark", "q", "s",
    "small", "span", "strong", "sub", "sup", "time", "u",
];

const INLINE_ATTRIBUTES: &[&str] = &["class", "dir", "id", "lang", "title"];

/// Extra layout tags kept by the preview sanitizer on top of ammonia's
/// defaults.
const PREVIEW_EXTRA_TAGS: &[&str] = &[
    "section", "article", "header", "footer", "nav", "aside", "main", "figure", "figcaption",
    "button", "label", "summary", "details",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Text,
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlSegment {
    pub index: usize,
    pub source_text: String,
    pub kind: SegmentKind,
    #[serde(default)]
    pub attribute_name: Option<String>,
    pub tag_name: String,
    pub marker_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedHtml {
    pub original_html: String,
    pub segments: Vec<HtmlSegment>,
    /// Inner HTML of `<head>`, when the page has one with content.
    #[serde(default)]
    pub head_content: Option<String>,
}

pub fn marker_id(index: usize) -> String {
    format!("seg-{}", index)
}

fn local_name(element: &ElementData) -> &str {
    &element.name.local
}

fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element().map(|e| local_name(e).to_string())
}

fn is_block(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

fn is_skipped(node: &NodeRef) -> bool {
    let skip = |n: &NodeRef| {
        n.as_element()
            .is_some_and(|e| SKIP_TAGS.contains(&local_name(e)))
    };
    skip(node) || node.ancestors().any(|ancestor| skip(&ancestor))
}

fn contains_nested_block(node: &NodeRef) -> bool {
    node.descendants()
        .any(|d| d.as_element().is_some_and(|e| is_block(local_name(e))))
}

fn inner_html(node: &NodeRef) -> String {
    node.children().map(|child| child.to_string()).collect()
}

fn is_text_segment(node: &NodeRef, name: &str) -> bool {
    is_block(name) && !contains_nested_block(node) && !node.text_contents().trim().is_empty()
}

/// Elements eligible for segments, in document order.
fn candidates(document: &NodeRef) -> Vec<(NodeRef, String)> {
    document
        .descendants()
        .filter(|node| !is_skipped(node))
        .filter_map(|node| tag_name(&node).map(|name| (node, name)))
        .collect()
}

/// Parses a page into segments. A page without any segment is an error.
pub fn parse_html(html: &str) -> Result<ParsedHtml, Error> {
    let document = kuchiki::parse_html().one(html);
    let mut segments = Vec::new();

    let mut push = |kind, tag: &str, attribute_name: Option<&str>, source_text: String| {
        let index = segments.len();
        segments.push(HtmlSegment {
            index,
            source_text,
            kind,
            attribute_name: attribute_name.map(str::to_string),
            tag_name: tag.to_string(),
            marker_id: marker_id(index),
        });
    };

    let mut text_blocks: Vec<NodeRef> = Vec::new();
    for (node, name) in candidates(&document) {
        if is_text_segment(&node, &name) {
            push(SegmentKind::Text, &name, None, inner_html(&node).trim().to_string());
            text_blocks.push(node.clone());
        }
        // Attributes inside a text segment travel with its inner HTML.
        if node.ancestors().any(|ancestor| text_blocks.contains(&ancestor)) {
            continue;
        }
        if let Some(element) = node.as_element() {
            let attributes = element.attributes.borrow();
            for attribute in TRANSLATABLE_ATTRIBUTES {
                if let Some(value) = attributes.get(*attribute)
                    && !value.trim().is_empty()
                {
                    push(SegmentKind::Attribute, &name, Some(*attribute), value.to_string());
                }
            }
        }
    }

    if segments.is_empty() {
        return Err(Error::NoTranslatableContent(
            "no translatable HTML segments found".to_string(),
        ));
    }

    let head_content = candidates(&document)
        .into_iter()
        .find(|(_, name)| name == "head")
        .map(|(node, _)| inner_html(&node).trim().to_string())
        .filter(|s| !s.is_empty());

    tracing::debug!(segments = segments.len(), "parsed HTML document");
    Ok(ParsedHtml {
        original_html: html.to_string(),
        segments,
        head_content,
    })
}

/// Sanitizes translated segment text down to inline markup. Scripts and
/// styles are dropped with their content.
pub fn sanitize_inline(text: &str) -> String {
    let mut builder = Builder::default();
    builder
        .tags(INLINE_TAGS.iter().copied().collect())
        .generic_attributes(INLINE_ATTRIBUTES.iter().copied().collect())
        .link_rel(None);
    builder.clean(text).to_string()
}

fn replace_children(target: &NodeRef, html: &str) {
    for child in target.children().collect::<Vec<_>>() {
        child.detach();
    }
    let fragment = kuchiki::parse_html().one(format!("<html><body>{}</body></html>", html));
    if let Some((body, _)) = candidates(&fragment)
        .into_iter()
        .find(|(_, name)| name == "body")
    {
        for child in body.children().collect::<Vec<_>>() {
            target.append(child);
        }
    }
}

/// Writes translations (keyed by segment index) back into the original page.
///
/// Each segment is located again by tag name plus its exact original inner
/// HTML or attribute value; the first element not yet used wins.
pub fn serialize_html(parsed: &ParsedHtml, translations: &BTreeMap<usize, String>) -> String {
    let document = kuchiki::parse_html().one(parsed.original_html.as_str());
    let elements = candidates(&document);
    let mut used_text: Vec<NodeRef> = Vec::new();
    let mut used_attributes: Vec<(NodeRef, String)> = Vec::new();

    for segment in &parsed.segments {
        let Some(translation) = translations.get(&segment.index).filter(|t| !t.is_empty()) else {
            continue;
        };

        match (segment.kind, &segment.attribute_name) {
            (SegmentKind::Attribute, Some(attribute)) => {
                let found = elements.iter().find(|(node, name)| {
                    *name == segment.tag_name
                        && !used_attributes.contains(&(node.clone(), attribute.clone()))
                        && node.as_element().is_some_and(|e| {
                            e.attributes.borrow().get(attribute.as_str())
                                == Some(segment.source_text.as_str())
                        })
                });
                match found {
                    Some((node, _)) => {
                        if let Some(element) = node.as_element() {
                            element
                                .attributes
                                .borrow_mut()
                                .insert(attribute.as_str(), translation.clone());
                        }
                        used_attributes.push((node.clone(), attribute.clone()));
                    }
                    None => tracing::warn!(marker = %segment.marker_id, "attribute segment not found"),
                }
            }
            _ => {
                let found = elements.iter().find(|(node, name)| {
                    *name == segment.tag_name
                        && !used_text.contains(node)
                        && inner_html(node).trim() == segment.source_text
                });
                match found {
                    Some((node, _)) => {
                        replace_children(node, &sanitize_inline(translation));
                        used_text.push(node.clone());
                    }
                    None => tracing::warn!(marker = %segment.marker_id, "text segment not found"),
                }
            }
        }
    }

    document.to_string()
}

/// Sanitizes a page for offline preview, rewriting relative URLs against
/// `base_url`.
pub fn render_preview(html: &str, base_url: &str) -> Result<String, Error> {
    let base = Url::parse(base_url)
        .map_err(|e| Error::validation_error(format!("invalid base URL `{}`: {}", base_url, e)))?;
    let mut builder = Builder::default();
    builder
        .add_tags(PREVIEW_EXTRA_TAGS.iter().copied())
        .url_relative(UrlRelative::RewriteWithBase(base));
    Ok(builder.clean(html).to_string())
}
