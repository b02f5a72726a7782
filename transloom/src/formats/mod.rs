//! All supported localization file formats for transloom.
//!
//! Each submodule owns one native document type with its parser and
//! serializer. The [`FormatType`] enum names the formats for generic handling
//! across the crate and maps each one to the codec that loads it.

pub mod docx;
pub mod document;
pub mod html;
pub mod po;
pub mod srt;
pub mod subtitle;
pub mod vtt;
pub mod xcloc;
pub mod xliff;

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

// Reexporting the documents for easier access
pub use document::{DocumentKind, DocumentParagraph, ParagraphKind, ParsedDocument};
pub use html::{HtmlSegment, ParsedHtml, SegmentKind};
pub use po::{PoDocument, PoEntry, PoHeader, PoKey, PoMsgstr};
pub use srt::SrtDocument;
pub use subtitle::Cue;
pub use vtt::VttDocument;
pub use xcloc::ContentsJson;
pub use xliff::{TransUnit, XliffDocument, XliffFile};

use crate::Error;

/// Represents all supported localization file formats for generic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatType {
    /// gettext `.po` / `.pot` catalog.
    Po,
    /// Xcode localization bundle (`.xcloc`), or a bare XLIFF 1.2 file.
    Xcloc,
    /// SubRip subtitles.
    Srt,
    /// WebVTT subtitles.
    Vtt,
    Html,
    /// Plain text document.
    Text,
    Markdown,
    /// Word document (`.docx`).
    Docx,
}

/// Implements [`std::fmt::Display`] for [`FormatType`].
///
/// # Example
/// ```rust
/// use transloom::formats::FormatType;
/// assert_eq!(FormatType::Po.to_string(), "po");
/// assert_eq!(FormatType::Markdown.to_string(), "markdown");
/// ```
impl Display for FormatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FormatType::Po => "po",
            FormatType::Xcloc => "xcloc",
            FormatType::Srt => "srt",
            FormatType::Vtt => "vtt",
            FormatType::Html => "html",
            FormatType::Text => "text",
            FormatType::Markdown => "markdown",
            FormatType::Docx => "docx",
        };
        f.write_str(name)
    }
}

/// Accepts format names and their common aliases, case-insensitively.
///
/// Returns [`crate::error::Error::UnknownFormat`] for unknown strings.
///
/// # Example
/// ```rust
/// use transloom::formats::FormatType;
/// use std::str::FromStr;
/// assert_eq!(FormatType::from_str("pot").unwrap(), FormatType::Po);
/// assert_eq!(FormatType::from_str("xliff").unwrap(), FormatType::Xcloc);
/// assert!(FormatType::from_str("foobar").is_err());
/// ```
impl FromStr for FormatType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "po" | "pot" | "gettext" => Ok(FormatType::Po),
            "xcloc" | "xliff" | "xlf" => Ok(FormatType::Xcloc),
            "srt" | "subrip" => Ok(FormatType::Srt),
            "vtt" | "webvtt" => Ok(FormatType::Vtt),
            "html" | "htm" => Ok(FormatType::Html),
            "text" | "txt" => Ok(FormatType::Text),
            "markdown" | "md" => Ok(FormatType::Markdown),
            "docx" => Ok(FormatType::Docx),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}

impl FormatType {
    /// Returns the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatType::Po => "po",
            FormatType::Xcloc => "xcloc",
            FormatType::Srt => "srt",
            FormatType::Vtt => "vtt",
            FormatType::Html => "html",
            FormatType::Text => "txt",
            FormatType::Markdown => "md",
            FormatType::Docx => "docx",
        }
    }

    /// Format id of the codec that loads this format.
    ///
    /// Text, Markdown and DOCX share the `document` codec.
    pub fn codec_id(&self) -> &'static str {
        match self {
            FormatType::Po => "po",
            FormatType::Xcloc => "xcloc",
            FormatType::Srt => "srt",
            FormatType::Vtt => "vtt",
            FormatType::Html => "html",
            FormatType::Text | FormatType::Markdown | FormatType::Docx => "document",
        }
    }

    /// Whether uploads of this format arrive as zip archives.
    pub fn is_bundle(&self) -> bool {
        matches!(self, FormatType::Xcloc | FormatType::Docx)
    }
}
