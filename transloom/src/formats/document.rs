//! Plain text, Markdown and DOCX documents as ordered paragraphs.
//!
//! Text and Markdown keep every separator they were split on, so an
//! untranslated document renders back byte for byte. DOCX paragraphs come
//! from [`crate::formats::docx`].

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{formats::docx::DocxPackage, types::VirtualFile};

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"^#{1,6}(\s|$)").unwrap();
    static ref SETEXT_UNDERLINE: Regex = Regex::new(r"\n(=+|-+)\s*$").unwrap();
    static ref LIST_ITEM: Regex = Regex::new(r"^\s*([-*+]|\d+[.)])\s").unwrap();
    static ref THEMATIC_BREAK: Regex = Regex::new(r"^\s*([-*_])(\s*[-*_]){2,}\s*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Text,
    Markdown,
    Docx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphKind {
    Heading,
    List,
    Quote,
    CodeBlock,
    /// Markdown thematic break (`---`, `***`).
    Rule,
    Paragraph,
}

impl ParagraphKind {
    /// Whether paragraphs of this kind are offered for translation.
    pub fn is_translatable(&self) -> bool {
        !matches!(self, ParagraphKind::CodeBlock | ParagraphKind::Rule)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentParagraph {
    /// Position among the blocks of a text/Markdown document, or the ordinal
    /// of the `<w:p>` element in a DOCX body.
    pub index: usize,
    pub text: String,
    pub kind: ParagraphKind,
    /// Separator that followed the paragraph in the source.
    #[serde(default)]
    pub trailing: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDocument {
    pub kind: DocumentKind,
    /// Markdown `---` frontmatter block, delimiters and final newline included.
    #[serde(default)]
    pub frontmatter: Option<String>,
    /// Blank lines before the first paragraph.
    #[serde(default)]
    pub leading: String,
    pub paragraphs: Vec<DocumentParagraph>,
    /// Zip members of a DOCX upload.
    #[serde(default)]
    pub package: Option<Vec<VirtualFile>>,
}

impl ParsedDocument {
    pub fn translatable(&self) -> impl Iterator<Item = &DocumentParagraph> {
        self.paragraphs
            .iter()
            .filter(|p| p.kind.is_translatable() && !p.text.trim().is_empty())
    }

    pub fn docx_package(&self) -> Option<DocxPackage> {
        self.package.as_ref().map(|members| DocxPackage {
            members: members.clone(),
        })
    }

    /// Renders a text or Markdown document, substituting translations keyed
    /// by paragraph index. Empty translations keep the source paragraph.
    pub fn render_text(&self, translations: &BTreeMap<usize, String>) -> String {
        let mut out = String::new();
        if let Some(frontmatter) = &self.frontmatter {
            out.push_str(frontmatter);
        }
        out.push_str(&self.leading);
        for paragraph in &self.paragraphs {
            match translations.get(&paragraph.index).filter(|t| !t.is_empty()) {
                Some(translation) => out.push_str(translation),
                None => out.push_str(&paragraph.text),
            }
            out.push_str(&paragraph.trailing);
        }
        out
    }
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Splits `body` on blank lines. With `fences`, fenced code blocks are kept
/// whole even when they contain blank lines.
fn split_blocks(body: &str, fences: bool) -> (String, Vec<(String, String)>) {
    let mut leading = String::new();
    let mut blocks: Vec<(String, String)> = Vec::new();
    let mut current = String::new();
    let mut gap = String::new();
    let mut in_fence = false;

    for line in body.split_inclusive('\n') {
        if !in_fence && line.trim().is_empty() {
            gap.push_str(line);
            continue;
        }
        if !gap.is_empty() {
            if current.is_empty() {
                leading.push_str(&gap);
            } else {
                blocks.push((std::mem::take(&mut current), std::mem::take(&mut gap)));
            }
            gap.clear();
        }
        if fences && is_fence(line) {
            in_fence = !in_fence;
        }
        current.push_str(line);
    }

    if current.is_empty() {
        match blocks.last_mut() {
            Some((_, trailing)) => trailing.push_str(&gap),
            None => leading.push_str(&gap),
        }
    } else {
        blocks.push((current, gap));
    }

    // Move each block's final line break into its separator.
    let blocks = blocks
        .into_iter()
        .map(|(text, gap)| {
            let kept = text.trim_end_matches(['\r', '\n']).len();
            let mut trailing = text[kept..].to_string();
            trailing.push_str(&gap);
            (text[..kept].to_string(), trailing)
        })
        .collect();
    (leading, blocks)
}

fn classify_markdown(block: &str) -> ParagraphKind {
    let first = block.lines().next().unwrap_or_default();
    if is_fence(first) || block.lines().all(|l| l.starts_with("    ") || l.starts_with('\t')) {
        ParagraphKind::CodeBlock
    } else if THEMATIC_BREAK.is_match(block) {
        ParagraphKind::Rule
    } else if HEADING.is_match(first) || SETEXT_UNDERLINE.is_match(block) {
        ParagraphKind::Heading
    } else if first.trim_start().starts_with('>') {
        ParagraphKind::Quote
    } else if LIST_ITEM.is_match(first) {
        ParagraphKind::List
    } else {
        ParagraphKind::Paragraph
    }
}

fn into_paragraphs(
    blocks: Vec<(String, String)>,
    classify: impl Fn(&str) -> ParagraphKind,
) -> Vec<DocumentParagraph> {
    blocks
        .into_iter()
        .enumerate()
        .map(|(index, (text, trailing))| DocumentParagraph {
            index,
            kind: classify(&text),
            text,
            trailing,
        })
        .collect()
}

/// Splits plain text into paragraphs on runs of two or more newlines.
pub fn parse_text(text: &str) -> ParsedDocument {
    let (leading, blocks) = split_blocks(text, false);
    ParsedDocument {
        kind: DocumentKind::Text,
        frontmatter: None,
        leading,
        paragraphs: into_paragraphs(blocks, |_| ParagraphKind::Paragraph),
        package: None,
    }
}

/// Extracts a leading `---` frontmatter block. Returns the block (with
/// delimiters) and the remaining body.
fn split_frontmatter(text: &str) -> (Option<String>, &str) {
    let Some(mut offset) = ["---\n", "---\r\n"]
        .iter()
        .find(|opener| text.starts_with(**opener))
        .map(|opener| opener.len())
    else {
        return (None, text);
    };
    for line in text[offset..].split_inclusive('\n') {
        offset += line.len();
        let marker = line.trim_end();
        if marker == "---" || marker == "..." {
            return (Some(text[..offset].to_string()), &text[offset..]);
        }
    }
    (None, text)
}

/// Splits Markdown into classified blocks, keeping fenced code blocks whole.
pub fn parse_markdown(text: &str) -> ParsedDocument {
    let (frontmatter, body) = split_frontmatter(text);
    let (leading, blocks) = split_blocks(body, true);
    let paragraphs = into_paragraphs(blocks, classify_markdown);
    tracing::debug!(
        paragraphs = paragraphs.len(),
        frontmatter = frontmatter.is_some(),
        "parsed Markdown document"
    );
    ParsedDocument {
        kind: DocumentKind::Markdown,
        frontmatter,
        leading,
        paragraphs,
        package: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_text_paragraphs_and_lossless_render() {
        let text = "\n\nFirst line\nstill first\n\n\n  \nSecond\n";
        let doc = parse_text(text);
        assert_eq!(doc.leading, "\n\n");
        assert_eq!(doc.paragraphs.len(), 2);
        assert_eq!(doc.paragraphs[0].text, "First line\nstill first");
        assert_eq!(doc.paragraphs[0].trailing, "\n\n\n  \n");
        assert_eq!(doc.paragraphs[1].text, "Second");
        assert_eq!(doc.render_text(&BTreeMap::new()), text);
    }

    #[test]
    fn test_text_render_with_translation() {
        let doc = parse_text("One\n\nTwo");
        let mut translations = BTreeMap::new();
        translations.insert(1, "Deux".to_string());
        assert_eq!(doc.render_text(&translations), "One\n\nDeux");
    }

    const MARKDOWN: &str = indoc! {"
        ---
        title: Guide
        ---
        # Getting started

        Install the tool:

        ```sh
        cargo install demo

        demo --help
        ```

        - first
        - second

        > quoted

        ***

        Closing words.
    "};

    #[test]
    fn test_markdown_frontmatter_and_kinds() {
        let doc = parse_markdown(MARKDOWN);
        assert_eq!(doc.frontmatter.as_deref(), Some("---\ntitle: Guide\n---\n"));
        let kinds: Vec<_> = doc.paragraphs.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParagraphKind::Heading,
                ParagraphKind::Paragraph,
                ParagraphKind::CodeBlock,
                ParagraphKind::List,
                ParagraphKind::Quote,
                ParagraphKind::Rule,
                ParagraphKind::Paragraph,
            ]
        );
        assert_eq!(
            doc.paragraphs[2].text,
            "```sh\ncargo install demo\n\ndemo --help\n```"
        );
    }

    #[test]
    fn test_markdown_translatable_skips_code_and_rules() {
        let doc = parse_markdown(MARKDOWN);
        let indices: Vec<_> = doc.translatable().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 3, 4, 6]);
    }

    #[test]
    fn test_markdown_lossless_render() {
        let doc = parse_markdown(MARKDOWN);
        assert_eq!(doc.render_text(&BTreeMap::new()), MARKDOWN);

        let mut translations = BTreeMap::new();
        translations.insert(0, "# Premiers pas".to_string());
        let out = doc.render_text(&translations);
        assert!(out.starts_with("---\ntitle: Guide\n---\n# Premiers pas\n\nInstall"));
    }

    #[test]
    fn test_unterminated_frontmatter_is_body() {
        let doc = parse_markdown("---\nnot closed\n");
        assert_eq!(doc.frontmatter, None);
        assert_eq!(doc.paragraphs[0].text, "---\nnot closed");
    }

    #[test]
    fn test_crlf_separators_render_verbatim() {
        let text = "\r\nOne\r\nstill one\r\n\r\nTwo\r\n";
        let doc = parse_text(text);
        assert_eq!(doc.leading, "\r\n");
        assert_eq!(doc.paragraphs[0].text, "One\r\nstill one");
        assert_eq!(doc.paragraphs[0].trailing, "\r\n\r\n");
        assert_eq!(doc.paragraphs[1].text, "Two");
        assert_eq!(doc.render_text(&BTreeMap::new()), text);

        let mut translations = BTreeMap::new();
        translations.insert(1, "Deux".to_string());
        assert!(doc.render_text(&translations).ends_with("\r\n\r\nDeux\r\n"));
    }

    #[test]
    fn test_crlf_markdown_frontmatter() {
        let text = "---\r\ntitle: Guide\r\n---\r\n# Title\r\n\r\nBody\r\n";
        let doc = parse_markdown(text);
        assert_eq!(doc.frontmatter.as_deref(), Some("---\r\ntitle: Guide\r\n---\r\n"));
        assert_eq!(doc.paragraphs[0].kind, ParagraphKind::Heading);
        assert_eq!(doc.paragraphs[0].text, "# Title");
        assert_eq!(doc.render_text(&BTreeMap::new()), text);
    }

    #[test]
    fn test_setext_heading() {
        assert_eq!(classify_markdown("Title\n====="), ParagraphKind::Heading);
        assert_eq!(classify_markdown("1. step"), ParagraphKind::List);
        assert_eq!(classify_markdown("    indented code"), ParagraphKind::CodeBlock);
    }
}
