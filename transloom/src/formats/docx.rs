//! DOCX paragraphs.
//!
//! `word/document.xml` is read as an XML event stream. Each `<w:p>` collects
//! the text of its `<w:t>` runs. Writing back streams the same events through
//! unchanged except inside translated paragraphs: the first `<w:t>` receives
//! the whole translation and later runs of that paragraph are emptied, so run
//! formatting stays in place.

use std::collections::BTreeMap;

use quick_xml::{
    Reader, Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};

use crate::{
    archive::{read_zip, replace_members, write_zip},
    error::Error,
    formats::document::{DocumentKind, DocumentParagraph, ParagraphKind, ParsedDocument},
    types::VirtualFile,
};

pub const DOCUMENT_XML_PATH: &str = "word/document.xml";

/// The zip members of a Word document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxPackage {
    pub members: Vec<VirtualFile>,
}

impl DocxPackage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_tree(read_zip(bytes)?)
    }

    pub fn from_tree(members: Vec<VirtualFile>) -> Result<Self, Error> {
        let package = DocxPackage { members };
        if package.document_member().is_none() {
            return Err(Error::NoTranslatableContent(format!(
                "no {} in package",
                DOCUMENT_XML_PATH
            )));
        }
        Ok(package)
    }

    pub fn document_member(&self) -> Option<&VirtualFile> {
        self.members.iter().find(|f| {
            f.path == DOCUMENT_XML_PATH || f.path.ends_with(&format!("/{}", DOCUMENT_XML_PATH))
        })
    }

    pub fn document_xml(&self) -> Result<String, Error> {
        self.document_member()
            .ok_or_else(|| {
                Error::NoTranslatableContent(format!("no {} in package", DOCUMENT_XML_PATH))
            })?
            .text()
    }

    /// Re-zips the package with `document.xml` replaced.
    pub fn export(&self, document_xml: String) -> Result<Vec<u8>, Error> {
        let path = self
            .document_member()
            .map(|f| f.path.clone())
            .unwrap_or_else(|| DOCUMENT_XML_PATH.to_string());
        let members = replace_members(&self.members, &[(path.as_str(), document_xml.into_bytes())]);
        write_zip(&members)
    }
}

/// Reads the paragraphs of a DOCX package. The package members are kept on
/// the document for export.
pub fn parse_docx(package: DocxPackage) -> Result<ParsedDocument, Error> {
    let paragraphs = extract_paragraphs(&package.document_xml()?)?;
    Ok(ParsedDocument {
        kind: DocumentKind::Docx,
        frontmatter: None,
        leading: String::new(),
        paragraphs,
        package: Some(package.members),
    })
}

/// Renders a DOCX document with translations keyed by paragraph ordinal.
pub fn render_docx(
    document: &ParsedDocument,
    translations: &BTreeMap<usize, String>,
) -> Result<Vec<u8>, Error> {
    let package = document.docx_package().ok_or_else(|| {
        Error::DataMismatch("document was not loaded from a DOCX package".to_string())
    })?;
    let xml = apply_translations(&package.document_xml()?, translations)?;
    package.export(xml)
}

fn style_kind(style: &str) -> ParagraphKind {
    let lower = style.to_ascii_lowercase();
    if lower.starts_with("heading") || lower == "title" || lower == "subtitle" {
        ParagraphKind::Heading
    } else if lower.contains("list") {
        ParagraphKind::List
    } else if lower.contains("quote") {
        ParagraphKind::Quote
    } else {
        ParagraphKind::Paragraph
    }
}

fn attribute_value(e: &BytesStart, name: &[u8]) -> Result<Option<String>, Error> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::DataMismatch(e.to_string()))?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

struct OpenParagraph {
    index: usize,
    text: String,
    kind: ParagraphKind,
}

/// Paragraphs with text, in document order. `index` is the ordinal of the
/// `<w:p>` element, counting empty ones.
pub fn extract_paragraphs(xml: &str) -> Result<Vec<DocumentParagraph>, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<OpenParagraph> = Vec::new();
    let mut done: Vec<DocumentParagraph> = Vec::new();
    let mut next_index = 0;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    stack.push(OpenParagraph {
                        index: next_index,
                        text: String::new(),
                        kind: ParagraphKind::Paragraph,
                    });
                    next_index += 1;
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => next_index += 1,
                b"w:pStyle" => {
                    if let (Some(open), Some(style)) =
                        (stack.last_mut(), attribute_value(&e, b"w:val")?)
                    {
                        open.kind = style_kind(&style);
                    }
                }
                b"w:numPr" => {
                    if let Some(open) = stack.last_mut() {
                        open.kind = ParagraphKind::List;
                    }
                }
                _ => {}
            },
            Event::Text(e) => {
                if in_text && let Some(open) = stack.last_mut() {
                    open.text.push_str(&e.unescape()?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:numPr" => {
                    if let Some(open) = stack.last_mut() {
                        open.kind = ParagraphKind::List;
                    }
                }
                b"w:p" => {
                    if let Some(open) = stack.pop()
                        && !open.text.trim().is_empty()
                    {
                        done.push(DocumentParagraph {
                            index: open.index,
                            text: open.text,
                            kind: open.kind,
                            trailing: String::new(),
                        });
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    // Nested paragraphs (text boxes) close before their parent.
    done.sort_by_key(|p| p.index);
    tracing::debug!(paragraphs = done.len(), "extracted DOCX paragraphs");
    Ok(done)
}

fn preserved_text_start(e: &BytesStart) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut start = BytesStart::new(name);
    for attr in e.attributes().with_checks(false).flatten() {
        if attr.key.as_ref() != b"xml:space" {
            start.push_attribute(attr);
        }
    }
    start.push_attribute(("xml:space", "preserve"));
    start.into_owned()
}

struct WritingParagraph {
    translation: Option<String>,
    wrote_first_run: bool,
}

/// Writes translations (keyed by paragraph ordinal) into `document.xml`.
pub fn apply_translations(
    xml: &str,
    translations: &BTreeMap<usize, String>,
) -> Result<String, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    let mut stack: Vec<WritingParagraph> = Vec::new();
    let mut next_index = 0;
    // Inside a `<w:t>` whose original text is being dropped.
    let mut dropping = false;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(e) if e.name().as_ref() == b"w:p" => {
                stack.push(WritingParagraph {
                    translation: translations.get(&next_index).filter(|t| !t.is_empty()).cloned(),
                    wrote_first_run: false,
                });
                next_index += 1;
            }
            Event::Empty(e) if e.name().as_ref() == b"w:p" => next_index += 1,
            Event::End(e) if e.name().as_ref() == b"w:p" => {
                if let Some(open) = stack.pop()
                    && open.translation.is_some()
                    && !open.wrote_first_run
                {
                    tracing::warn!("translated DOCX paragraph has no text run");
                }
            }
            Event::Start(e) if e.name().as_ref() == b"w:t" => {
                if let Some(open) = stack.last_mut()
                    && let Some(translation) = &open.translation
                {
                    dropping = true;
                    if !open.wrote_first_run {
                        open.wrote_first_run = true;
                        writer.write_event(Event::Start(preserved_text_start(e)))?;
                        writer.write_event(Event::Text(BytesText::new(translation)))?;
                        continue;
                    }
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"w:t" => {
                if let Some(open) = stack.last_mut()
                    && let Some(translation) = &open.translation
                    && !open.wrote_first_run
                {
                    open.wrote_first_run = true;
                    let start = preserved_text_start(e);
                    let end = BytesEnd::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                    writer.write_event(Event::Start(start))?;
                    writer.write_event(Event::Text(BytesText::new(translation)))?;
                    writer.write_event(Event::End(end))?;
                    continue;
                }
            }
            Event::End(e) if e.name().as_ref() == b"w:t" => dropping = false,
            Event::Text(_) | Event::CData(_) if dropping => continue,
            Event::Eof => break,
            _ => {}
        }
        writer.write_event(event)?;
    }

    String::from_utf8(writer.into_inner()).map_err(|e| Error::DataMismatch(e.to_string()))
}
