//! Core, format-agnostic types for transloom.
//! Codecs project their native documents into these; clients mirror edits back.

use std::{
    collections::HashMap,
    fmt::Display,
    path::Path,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::{
    error::Error,
    formats::{document::ParagraphKind, html::SegmentKind},
    traits::Parser,
};

impl Parser for TranslationProject {
    /// Parse from any reader.
    fn from_reader<R: std::io::BufRead>(reader: R) -> Result<Self, Error> {
        serde_json::from_reader(reader).map_err(Error::Parse)
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: std::io::Write>(&self, mut writer: W) -> Result<(), Error> {
        serde_json::to_writer_pretty(&mut writer, self).map_err(Error::Parse)
    }
}

/// The top-level container produced by a client's `load`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationProject {
    /// Display name, usually the uploaded file name.
    pub name: String,

    /// Project-wide source language (BCP 47).
    pub source_language: String,

    #[serde(default)]
    pub target_languages: Vec<String>,

    /// Ordered list of resources (one per logical file).
    #[serde(default)]
    pub resources: Vec<TranslationResource>,

    /// Any other project-level fields.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";

impl TranslationProject {
    pub fn new(name: impl Into<String>) -> Self {
        TranslationProject {
            name: name.into(),
            source_language: DEFAULT_SOURCE_LANGUAGE.to_string(),
            target_languages: Vec::new(),
            resources: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn find_resource(&self, id: &str) -> Option<&TranslationResource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn find_resource_mut(&mut self, id: &str) -> Option<&mut TranslationResource> {
        self.resources.iter_mut().find(|r| r.id == id)
    }

    pub fn find_entry(&self, resource_id: &str, entry_id: &str) -> Option<&TranslationEntry> {
        self.find_resource(resource_id)?.find_entry(entry_id)
    }

    pub fn find_entry_mut(
        &mut self,
        resource_id: &str,
        entry_id: &str,
    ) -> Option<&mut TranslationEntry> {
        self.find_resource_mut(resource_id)?.find_entry_mut(entry_id)
    }

    /// Iterates every entry of every resource in order.
    pub fn entries(&self) -> impl Iterator<Item = &TranslationEntry> {
        self.resources.iter().flat_map(|r| r.entries.iter())
    }

    pub fn entry_count(&self) -> usize {
        self.resources.iter().map(|r| r.entries.len()).sum()
    }

    pub fn translated_count(&self) -> usize {
        self.entries().filter(|e| e.is_translated()).count()
    }

    /// Overrides the project languages with caller-supplied hints.
    ///
    /// Resources without their own languages inherit the hints as well.
    pub fn apply_language_hints(&mut self, source: Option<&str>, target: Option<&str>) {
        if let Some(source) = source {
            let source = normalize_language_tag(source);
            for resource in &mut self.resources {
                resource.source_language.get_or_insert_with(|| source.clone());
            }
            self.source_language = source;
        }
        if let Some(target) = target {
            let target = normalize_language_tag(target);
            for resource in &mut self.resources {
                resource.target_language.get_or_insert_with(|| target.clone());
            }
            self.target_languages = vec![target];
        }
    }
}

/// A named group of entries corresponding to one logical file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResource {
    pub id: String,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub source_language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub target_language: Option<String>,

    /// Ordered list of all entries in this resource.
    #[serde(default)]
    pub entries: Vec<TranslationEntry>,
}

impl TranslationResource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        TranslationResource {
            id: id.into(),
            name: name.into(),
            source_language: None,
            target_language: None,
            entries: Vec::new(),
        }
    }

    pub(crate) fn add_entry(&mut self, entry: TranslationEntry) {
        self.entries.push(entry);
    }

    pub fn find_entry(&self, id: &str) -> Option<&TranslationEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn find_entry_mut(&mut self, id: &str) -> Option<&mut TranslationEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}

/// One translatable unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationEntry {
    /// Unique within its resource. Format specific: a numeric index, a
    /// `{index}:plural:{form}` key for PO plurals, or a segment marker.
    pub id: String,

    pub source_text: String,

    /// Empty means untranslated.
    #[serde(default)]
    pub target_text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub context: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub max_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub plural_form: Option<PluralCategory>,

    /// Format-specific data the codec needs to find its way back.
    #[serde(default)]
    pub metadata: EntryMetadata,
}

impl TranslationEntry {
    pub fn new(id: impl Into<String>, source_text: impl Into<String>) -> Self {
        TranslationEntry {
            id: id.into(),
            source_text: source_text.into(),
            target_text: String::new(),
            comment: None,
            context: None,
            max_length: None,
            plural_form: None,
            metadata: EntryMetadata::None,
        }
    }

    pub fn is_translated(&self) -> bool {
        !self.target_text.is_empty()
    }

    pub(crate) fn apply_patch(&mut self, patch: &EntryPatch) {
        if let Some(target) = &patch.target_text {
            self.target_text = target.clone();
        }
        if let Some(comment) = &patch.comment {
            self.comment = if comment.is_empty() {
                None
            } else {
                Some(comment.clone())
            };
        }
    }
}

impl Display for TranslationEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TranslationEntry {{ id: {}, source: {}, target: {} }}",
            self.id, self.source_text, self.target_text
        )
    }
}

/// Per-format payload carried alongside a [`TranslationEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum EntryMetadata {
    #[default]
    None,
    Po(PoEntryMetadata),
    Xliff(XliffUnitMetadata),
    Subtitle(CueMetadata),
    Html(HtmlSegmentMetadata),
    Document(ParagraphMetadata),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoEntryMetadata {
    /// Position of the entry in the PO document (header excluded).
    pub po_index: usize,
    /// `msgstr[n]` index for plural rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub plural_index: Option<usize>,
    /// The untouched msgid, even when `source_text` shows reference text.
    pub msgid: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub extracted_comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XliffUnitMetadata {
    pub file_index: usize,
    pub unit_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CueMetadata {
    pub cue_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub cue_id: Option<String>,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlSegmentMetadata {
    pub kind: SegmentKind,
    pub tag_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub attribute_name: Option<String>,
    pub marker_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphMetadata {
    pub paragraph_index: usize,
    pub kind: ParagraphKind,
}

/// Standard CLDR plural forms.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Clone, Copy, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

impl Display for PluralCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluralCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ZERO" => Ok(PluralCategory::Zero),
            "ONE" => Ok(PluralCategory::One),
            "TWO" => Ok(PluralCategory::Two),
            "FEW" => Ok(PluralCategory::Few),
            "MANY" => Ok(PluralCategory::Many),
            "OTHER" => Ok(PluralCategory::Other),
            _ => Err(format!("Unknown plural category: {}", s)),
        }
    }
}

/// A partial edit to one entry. `None` fields are left untouched; an empty
/// comment clears it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub target_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment: Option<String>,
}

impl EntryPatch {
    pub fn target(text: impl Into<String>) -> Self {
        EntryPatch {
            target_text: Some(text.into()),
            comment: None,
        }
    }
}

/// An [`EntryPatch`] addressed to one entry of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryUpdate {
    pub resource_id: String,
    pub entry_id: String,
    #[serde(flatten)]
    pub patch: EntryPatch,
}

/// One file of an upload: a path and its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VirtualFile {
    pub path: String,
    #[serde(with = "crate::archive::base64_bytes")]
    pub content: Vec<u8>,
}

impl VirtualFile {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        VirtualFile {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Last path component.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Lowercased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }

    /// Decodes the content as text. A byte order mark selects the encoding;
    /// anything else must be valid UTF-8.
    pub fn text(&self) -> Result<String, Error> {
        let (encoding, bom_len) = encoding_rs::Encoding::for_bom(&self.content)
            .unwrap_or((encoding_rs::UTF_8, 0));
        let (text, had_errors) = encoding.decode_without_bom_handling(&self.content[bom_len..]);
        if had_errors {
            return Err(Error::DataMismatch(format!(
                "`{}` is not valid {} text",
                self.path,
                encoding.name()
            )));
        }
        Ok(text.into_owned())
    }
}

/// What an upload hands to the detection registry and to `load`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum UploadPayload {
    SingleFile {
        file: VirtualFile,
    },
    #[serde(rename_all = "camelCase")]
    Archive {
        tree: Vec<VirtualFile>,
        original_file_name: String,
    },
}

impl UploadPayload {
    pub fn single_file(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        UploadPayload::SingleFile {
            file: VirtualFile::new(path, content),
        }
    }

    pub fn archive(original_file_name: impl Into<String>, tree: Vec<VirtualFile>) -> Self {
        UploadPayload::Archive {
            tree,
            original_file_name: original_file_name.into(),
        }
    }

    /// The uploaded file name (the archive name for archives).
    pub fn file_name(&self) -> &str {
        match self {
            UploadPayload::SingleFile { file } => file.file_name(),
            UploadPayload::Archive {
                original_file_name, ..
            } => original_file_name,
        }
    }

    pub fn extension(&self) -> Option<String> {
        extension_of(self.file_name())
    }

    pub fn as_single_file(&self) -> Option<&VirtualFile> {
        match self {
            UploadPayload::SingleFile { file } => Some(file),
            UploadPayload::Archive { .. } => None,
        }
    }

    pub fn tree(&self) -> Option<&[VirtualFile]> {
        match self {
            UploadPayload::SingleFile { .. } => None,
            UploadPayload::Archive { tree, .. } => Some(tree),
        }
    }

    /// Finds the first archive member whose path satisfies `predicate`.
    pub fn find_member(&self, predicate: impl Fn(&VirtualFile) -> bool) -> Option<&VirtualFile> {
        self.tree()?.iter().find(|f| predicate(f))
    }
}

/// The bytes produced by `export_file`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFile {
    pub file_name: String,
    #[serde(with = "crate::archive::base64_bytes")]
    pub bytes: Vec<u8>,
    /// Companion CSV glossary when terms were supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub glossary: Option<VirtualFile>,
}

pub(crate) fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
}

/// Normalizes a language tag to BCP 47 (`zh_CN` → `zh-CN`). Unparsable tags are
/// returned trimmed but otherwise untouched.
pub fn normalize_language_tag(tag: &str) -> String {
    let trimmed = tag.trim();
    let candidate = trimmed.replace('_', "-");
    match candidate.parse::<LanguageIdentifier>() {
        Ok(lang_id) => lang_id.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> TranslationProject {
        let mut resource = TranslationResource::new("messages", "messages.po");
        let mut hello = TranslationEntry::new("0", "Hello");
        hello.target_text = "Bonjour".to_string();
        resource.add_entry(hello);
        resource.add_entry(TranslationEntry::new("1", "Bye"));

        let mut project = TranslationProject::new("messages.po");
        project.resources.push(resource);
        project
    }

    #[test]
    fn test_project_find_entry() {
        let project = sample_project();
        let entry = project.find_entry("messages", "0").unwrap();
        assert_eq!(entry.source_text, "Hello");
        assert!(project.find_entry("messages", "9").is_none());
        assert!(project.find_entry("other", "0").is_none());
    }

    #[test]
    fn test_project_counts() {
        let project = sample_project();
        assert_eq!(project.entry_count(), 2);
        assert_eq!(project.translated_count(), 1);
    }

    #[test]
    fn test_apply_patch() {
        let mut entry = TranslationEntry::new("0", "Hello");
        entry.apply_patch(&EntryPatch {
            target_text: Some("Hallo".to_string()),
            comment: Some("greeting".to_string()),
        });
        assert_eq!(entry.target_text, "Hallo");
        assert_eq!(entry.comment.as_deref(), Some("greeting"));

        entry.apply_patch(&EntryPatch {
            target_text: None,
            comment: Some(String::new()),
        });
        assert_eq!(entry.target_text, "Hallo");
        assert_eq!(entry.comment, None);
    }

    #[test]
    fn test_apply_language_hints() {
        let mut project = sample_project();
        project.apply_language_hints(Some("en_US"), Some("fr"));
        assert_eq!(project.source_language, "en-US");
        assert_eq!(project.target_languages, vec!["fr".to_string()]);
        assert_eq!(
            project.resources[0].target_language.as_deref(),
            Some("fr")
        );
    }

    #[test]
    fn test_normalize_language_tag() {
        assert_eq!(normalize_language_tag("zh_CN"), "zh-CN");
        assert_eq!(normalize_language_tag(" pt-br "), "pt-BR");
        assert_eq!(normalize_language_tag("not a tag"), "not a tag");
    }

    #[test]
    fn test_plural_category_from_str() {
        assert_eq!(PluralCategory::from_str("one").unwrap(), PluralCategory::One);
        assert_eq!(PluralCategory::from_str("OTHER").unwrap(), PluralCategory::Other);
        assert!(PluralCategory::from_str("invalid").is_err());
        assert_eq!(PluralCategory::Few.to_string(), "few");
    }

    #[test]
    fn test_virtual_file_text_decodes_utf16_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "msgid".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let file = VirtualFile::new("dir/fr.po", bytes);
        assert_eq!(file.text().unwrap(), "msgid");
        assert_eq!(file.file_name(), "fr.po");
        assert_eq!(file.extension().as_deref(), Some("po"));
    }

    #[test]
    fn test_virtual_file_rejects_invalid_utf8() {
        let file = VirtualFile::new("broken.txt", vec![0xC3, 0x28]);
        assert!(file.text().is_err());
    }

    #[test]
    fn test_payload_serde_shape() {
        let payload = UploadPayload::single_file("a.srt", b"1".to_vec());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "single-file");
        assert_eq!(json["file"]["path"], "a.srt");

        let archive = UploadPayload::archive("b.zip", vec![VirtualFile::new("x", b"y".to_vec())]);
        let json = serde_json::to_value(&archive).unwrap();
        assert_eq!(json["kind"], "archive");
        assert_eq!(json["originalFileName"], "b.zip");
        let back: UploadPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, archive);
    }

    #[test]
    fn test_entry_metadata_serde_tag() {
        let mut entry = TranslationEntry::new("0:plural:1", "%d files");
        entry.metadata = EntryMetadata::Po(PoEntryMetadata {
            po_index: 0,
            plural_index: Some(1),
            msgid: "%d file".to_string(),
            ..PoEntryMetadata::default()
        });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["metadata"]["format"], "po");
        assert_eq!(json["metadata"]["pluralIndex"], 1);
        let back: TranslationEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_project_parser_trait() {
        let project = sample_project();
        let text = project.to_text().unwrap();
        let parsed = TranslationProject::from_str(&text).unwrap();
        assert_eq!(parsed, project);
    }
}
