//! Support for gettext PO catalogs.
//!
//! Parses into [`PoDocument`], keeping comments, flags, context and sparse
//! plural maps so that `parse_po(serialize_po(doc))` gives back the same
//! structure.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::{BufRead, Write};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    escape::{extract_quoted, format_keyword},
    traits::{Parser, read_normalized},
    types::normalize_language_tag,
};

lazy_static! {
    static ref NPLURALS_REGEX: Regex = Regex::new(r"nplurals\s*=\s*(\d+)").unwrap();
}

/// Plural form count assumed when the header does not say.
pub const DEFAULT_NPLURALS: usize = 2;

/// A parsed PO catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct PoDocument {
    /// The `msgid ""` pseudo-entry, if the catalog starts with one.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub header: Option<PoHeader>,

    /// Message entries, header excluded.
    #[serde(default)]
    pub entries: Vec<PoEntry>,

    /// Obsolete (`#~`) blocks, kept verbatim and written after the entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub obsolete: Vec<String>,
}

impl PoDocument {
    pub fn nplurals(&self) -> usize {
        self.header
            .as_ref()
            .map(|h| h.nplurals)
            .unwrap_or(DEFAULT_NPLURALS)
    }

    /// Target language from the `Language:` header field, normalized.
    pub fn language(&self) -> Option<String> {
        self.header.as_ref().and_then(PoHeader::language)
    }

    /// Finds an entry by its natural key.
    pub fn find(&self, key: &PoKey) -> Option<(usize, &PoEntry)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.msgctxt == key.context && e.msgid == key.msgid)
    }
}

impl Parser for PoDocument {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        Ok(parse_po(&read_normalized(reader)?))
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        writer
            .write_all(serialize_po(self).as_bytes())
            .map_err(Error::Io)
    }
}

/// The header pseudo-entry. `raw` is its msgstr, a list of `Key: value` lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PoHeader {
    pub raw: String,
    pub nplurals: usize,
    #[serde(default)]
    pub comments: PoComments,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub flags: Vec<String>,
}

impl PoHeader {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let nplurals = extract_nplurals(&raw);
        PoHeader {
            raw,
            nplurals,
            comments: PoComments::default(),
            flags: Vec::new(),
        }
    }

    /// `Key: value` pairs in order. Lines without a colon are skipped.
    pub fn fields(&self) -> Vec<(String, String)> {
        self.raw
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }

    /// Value of a header field, matched case-insensitively.
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields()
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    pub fn language(&self) -> Option<String> {
        self.field("Language")
            .filter(|l| !l.is_empty())
            .map(|l| normalize_language_tag(&l))
    }
}

fn extract_nplurals(raw: &str) -> usize {
    raw.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("Plural-Forms"))
        .and_then(|(_, value)| NPLURALS_REGEX.captures(value))
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_NPLURALS)
}

/// Comment lines attached to an entry, without their `#x` markers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct PoComments {
    /// `# ...`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub translator: Vec<String>,
    /// `#. ...`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub extracted: Vec<String>,
    /// `#: ...`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub references: Vec<String>,
    /// `#| ...`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub previous: Vec<String>,
}

impl PoComments {
    fn write_to(&self, out: &mut String, flags: &[String]) {
        for line in &self.translator {
            if line.is_empty() {
                out.push_str("#\n");
            } else {
                out.push_str(&format!("# {}\n", line));
            }
        }
        for line in &self.extracted {
            out.push_str(&format!("#. {}\n", line));
        }
        for line in &self.references {
            out.push_str(&format!("#: {}\n", line));
        }
        if !flags.is_empty() {
            out.push_str(&format!("#, {}\n", flags.join(", ")));
        }
        for line in &self.previous {
            out.push_str(&format!("#| {}\n", line));
        }
    }
}

/// Translation side of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoMsgstr {
    /// No msgstr line at all.
    #[default]
    Missing,
    Singular(String),
    /// `msgstr[n]` lines; sparse, keyed by index.
    Plural(BTreeMap<usize, String>),
}

impl PoMsgstr {
    /// Whether any string is non-empty.
    pub fn has_translation(&self) -> bool {
        match self {
            PoMsgstr::Missing => false,
            PoMsgstr::Singular(s) => !s.is_empty(),
            PoMsgstr::Plural(forms) => forms.values().any(|s| !s.is_empty()),
        }
    }

    pub fn singular(&self) -> Option<&str> {
        match self {
            PoMsgstr::Singular(s) => Some(s),
            _ => None,
        }
    }

    pub fn form(&self, index: usize) -> Option<&str> {
        match self {
            PoMsgstr::Plural(forms) => forms.get(&index).map(String::as_str),
            _ => None,
        }
    }
}

/// One message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct PoEntry {
    #[serde(default)]
    pub comments: PoComments,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub msgctxt: Option<String>,
    pub msgid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub msgid_plural: Option<String>,
    #[serde(default)]
    pub msgstr: PoMsgstr,
}

impl PoEntry {
    pub fn new(msgid: impl Into<String>, msgstr: impl Into<String>) -> Self {
        PoEntry {
            msgid: msgid.into(),
            msgstr: PoMsgstr::Singular(msgstr.into()),
            ..PoEntry::default()
        }
    }

    pub fn key(&self) -> PoKey {
        PoKey {
            context: self.msgctxt.clone(),
            msgid: self.msgid.clone(),
        }
    }

    pub fn is_plural(&self) -> bool {
        self.msgid_plural.is_some()
    }

    pub fn is_fuzzy(&self) -> bool {
        self.flags.iter().any(|f| f == "fuzzy")
    }

    fn write_to(&self, out: &mut String) {
        self.comments.write_to(out, &self.flags);
        if let Some(ctx) = &self.msgctxt {
            out.push_str(&format_keyword("msgctxt", ctx));
        }
        out.push_str(&format_keyword("msgid", &self.msgid));
        if let Some(plural) = &self.msgid_plural {
            out.push_str(&format_keyword("msgid_plural", plural));
        }
        match &self.msgstr {
            PoMsgstr::Missing => {}
            PoMsgstr::Singular(s) => out.push_str(&format_keyword("msgstr", s)),
            PoMsgstr::Plural(forms) => {
                for (index, value) in forms {
                    out.push_str(&format_keyword(&format!("msgstr[{}]", index), value));
                }
            }
        }
    }
}

/// Natural identity of an entry across catalog revisions: context + msgid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoKey {
    pub context: Option<String>,
    pub msgid: String,
}

impl PoKey {
    pub fn new(context: Option<&str>, msgid: &str) -> Self {
        PoKey {
            context: context.map(str::to_string),
            msgid: msgid.to_string(),
        }
    }
}

impl Display for PoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "{}|{}", ctx, self.msgid),
            None => write!(f, "{}", self.msgid),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Msgctxt,
    Msgid,
    MsgidPlural,
    Msgstr,
    MsgstrPlural(usize),
}

#[derive(Default)]
struct EntryBuilder {
    comments: PoComments,
    flags: Vec<String>,
    obsolete: Vec<String>,
    msgctxt: Option<String>,
    msgid: Option<String>,
    msgid_plural: Option<String>,
    msgstr: Option<String>,
    msgstr_plural: BTreeMap<usize, String>,
    last: Option<Field>,
}

impl EntryBuilder {
    fn saw_msgstr(&self) -> bool {
        self.msgstr.is_some() || !self.msgstr_plural.is_empty()
    }

    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Msgctxt => self.msgctxt = Some(value),
            Field::Msgid => self.msgid = Some(value),
            Field::MsgidPlural => self.msgid_plural = Some(value),
            Field::Msgstr => self.msgstr = Some(value),
            Field::MsgstrPlural(i) => {
                self.msgstr_plural.insert(i, value);
            }
        }
        self.last = Some(field);
    }

    fn append(&mut self, value: &str) {
        let target = match self.last {
            Some(Field::Msgctxt) => self.msgctxt.as_mut(),
            Some(Field::Msgid) => self.msgid.as_mut(),
            Some(Field::MsgidPlural) => self.msgid_plural.as_mut(),
            Some(Field::Msgstr) => self.msgstr.as_mut(),
            Some(Field::MsgstrPlural(i)) => self.msgstr_plural.get_mut(&i),
            None => None,
        };
        match target {
            Some(s) => s.push_str(value),
            None => tracing::debug!("dangling PO continuation line ignored"),
        }
    }

    fn comment(&mut self, line: &str) {
        if let Some(rest) = line.strip_prefix("#.") {
            self.comments.extracted.push(strip_one_space(rest).to_string());
        } else if let Some(rest) = line.strip_prefix("#:") {
            self.comments.references.push(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("#,") {
            self.flags.extend(
                rest.split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string),
            );
        } else if let Some(rest) = line.strip_prefix("#|") {
            self.comments.previous.push(rest.trim().to_string());
        } else if line.starts_with("#~") {
            self.obsolete.push(line.to_string());
        } else if let Some(rest) = line.strip_prefix('#') {
            self.comments.translator.push(strip_one_space(rest).to_string());
        }
    }
}

fn strip_one_space(s: &str) -> &str {
    s.strip_prefix(' ').unwrap_or(s).trim_end()
}

/// Returns the text after `keyword` when the line starts with it as a whole
/// word (`msgid "x"` matches `msgid`, `msgid_plural "x"` does not).
fn keyword_rest<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '"' => Some(rest),
        _ => None,
    }
}

fn finish_block(builder: EntryBuilder, doc: &mut PoDocument) {
    if !builder.obsolete.is_empty() {
        doc.obsolete.push(builder.obsolete.join("\n"));
    }

    let Some(msgid) = builder.msgid else {
        if !builder.comments.translator.is_empty() || !builder.flags.is_empty() {
            tracing::debug!("PO comment block without msgid dropped");
        }
        return;
    };

    let msgstr = if !builder.msgstr_plural.is_empty() {
        PoMsgstr::Plural(builder.msgstr_plural)
    } else if let Some(s) = builder.msgstr {
        PoMsgstr::Singular(s)
    } else {
        PoMsgstr::Missing
    };

    if doc.header.is_none()
        && doc.entries.is_empty()
        && msgid.is_empty()
        && builder.msgctxt.is_none()
        && builder.msgid_plural.is_none()
        && let PoMsgstr::Singular(raw) = &msgstr
    {
        let mut header = PoHeader::from_raw(raw.clone());
        header.comments = builder.comments;
        header.flags = builder.flags;
        doc.header = Some(header);
        return;
    }

    doc.entries.push(PoEntry {
        comments: builder.comments,
        flags: builder.flags,
        msgctxt: builder.msgctxt,
        msgid,
        msgid_plural: builder.msgid_plural,
        msgstr,
    });
}

/// Parses PO text. Malformed lines are skipped; this never fails.
pub fn parse_po(text: &str) -> PoDocument {
    let mut doc = PoDocument::default();
    let mut builder = EntryBuilder::default();

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if line.is_empty() {
            finish_block(std::mem::take(&mut builder), &mut doc);
            continue;
        }

        if line.starts_with('#') {
            // A comment after a complete msgstr starts the next entry.
            if builder.saw_msgstr() {
                finish_block(std::mem::take(&mut builder), &mut doc);
            }
            builder.comment(line);
            continue;
        }

        if line.starts_with('"') {
            if let Some(value) = extract_quoted(line) {
                builder.append(&value);
            }
            continue;
        }

        if let Some(rest) = keyword_rest(line, "msgctxt") {
            if builder.saw_msgstr() || builder.msgid.is_some() {
                finish_block(std::mem::take(&mut builder), &mut doc);
            }
            builder.set(Field::Msgctxt, extract_quoted(rest).unwrap_or_default());
        } else if let Some(rest) = keyword_rest(line, "msgid_plural") {
            builder.set(Field::MsgidPlural, extract_quoted(rest).unwrap_or_default());
        } else if let Some(rest) = keyword_rest(line, "msgid") {
            if builder.saw_msgstr() || builder.msgid.is_some() {
                finish_block(std::mem::take(&mut builder), &mut doc);
            }
            builder.set(Field::Msgid, extract_quoted(rest).unwrap_or_default());
        } else if let Some(rest) = line.strip_prefix("msgstr[") {
            let Some((index, value)) = rest.split_once(']') else {
                tracing::warn!(line, "malformed msgstr[n] line skipped");
                continue;
            };
            match index.trim().parse::<usize>() {
                Ok(index) => builder.set(
                    Field::MsgstrPlural(index),
                    extract_quoted(value).unwrap_or_default(),
                ),
                Err(_) => tracing::warn!(line, "invalid plural index skipped"),
            }
        } else if let Some(rest) = keyword_rest(line, "msgstr") {
            builder.set(Field::Msgstr, extract_quoted(rest).unwrap_or_default());
        } else {
            tracing::debug!(line, "unrecognized PO line skipped");
        }
    }
    finish_block(builder, &mut doc);

    tracing::debug!(
        entries = doc.entries.len(),
        has_header = doc.header.is_some(),
        "parsed PO document"
    );
    doc
}

/// Serializes a document back to PO text. Entries are separated by one blank
/// line; strings containing newlines use continuation style.
pub fn serialize_po(doc: &PoDocument) -> String {
    let mut blocks = Vec::with_capacity(doc.entries.len() + 1);

    if let Some(header) = &doc.header {
        let mut out = String::new();
        header.comments.write_to(&mut out, &header.flags);
        out.push_str("msgid \"\"\n");
        out.push_str(&format_keyword("msgstr", &header.raw));
        blocks.push(out);
    }

    for entry in &doc.entries {
        let mut out = String::new();
        entry.write_to(&mut out);
        blocks.push(out);
    }

    for obsolete in &doc.obsolete {
        blocks.push(format!("{}\n", obsolete));
    }

    blocks.join("\n")
}
