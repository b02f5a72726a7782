//! HTML pages: one entry per segment, id = the segment's marker (`seg-3`).

use std::collections::BTreeMap;

use crate::{
    clients::{
        TranslationClient, apply_updates, from_format_data, single_file_text, single_resource,
    },
    codec::{Codec, Detection},
    error::Error,
    formats::html::{ParsedHtml, SegmentKind, parse_html, render_preview, serialize_html},
    glossary::{Term, glossary_file},
    types::{
        EntryMetadata, EntryUpdate, ExportedFile, HtmlSegmentMetadata, TranslationEntry,
        TranslationProject, TranslationResource, UploadPayload,
    },
};

pub const FORMAT_ID: &str = "html";

#[derive(Debug, Default)]
pub struct HtmlClient {
    state: Option<(String, ParsedHtml, TranslationProject)>,
}

impl HtmlClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parsed(&self) -> Result<&ParsedHtml, Error> {
        Ok(&self.state.as_ref().ok_or(Error::NotLoaded)?.1)
    }

    fn translated_html(&self) -> Result<String, Error> {
        let (_, parsed, project) = self.state.as_ref().ok_or(Error::NotLoaded)?;
        let resource = single_resource(project)?;
        let by_marker: BTreeMap<&str, usize> = parsed
            .segments
            .iter()
            .map(|s| (s.marker_id.as_str(), s.index))
            .collect();
        let translations = super::translations_by_index(resource, |entry| {
            by_marker.get(entry.id.as_str()).copied()
        });
        Ok(serialize_html(parsed, &translations))
    }

    /// The translated page, sanitized for display with relative URLs made
    /// absolute against `base_url`.
    pub fn preview(&self, base_url: &str) -> Result<String, Error> {
        render_preview(&self.translated_html()?, base_url)
    }
}

fn build_project(file_name: &str, parsed: &ParsedHtml) -> TranslationProject {
    let mut resource = TranslationResource::new(file_name, file_name);
    for segment in &parsed.segments {
        let mut entry = TranslationEntry::new(segment.marker_id.clone(), segment.source_text.clone());
        entry.context = Some(match (segment.kind, &segment.attribute_name) {
            (SegmentKind::Attribute, Some(attribute)) => format!("{}@{}", segment.tag_name, attribute),
            _ => segment.tag_name.clone(),
        });
        entry.metadata = EntryMetadata::Html(HtmlSegmentMetadata {
            kind: segment.kind,
            tag_name: segment.tag_name.clone(),
            attribute_name: segment.attribute_name.clone(),
            marker_id: segment.marker_id.clone(),
        });
        resource.add_entry(entry);
    }
    let mut project = TranslationProject::new(file_name);
    project.resources.push(resource);
    project
}

impl TranslationClient for HtmlClient {
    fn format_id(&self) -> &'static str {
        FORMAT_ID
    }

    fn load(&mut self, payload: &UploadPayload) -> Result<(), Error> {
        let text = single_file_text(payload, "HTML")?;
        let parsed = parse_html(&text)?;
        let file_name = payload.file_name().to_string();
        let project = build_project(&file_name, &parsed);
        self.state = Some((file_name, parsed, project));
        Ok(())
    }

    fn project(&self) -> Result<&TranslationProject, Error> {
        Ok(&self.state.as_ref().ok_or(Error::NotLoaded)?.2)
    }

    fn project_mut(&mut self) -> Result<&mut TranslationProject, Error> {
        Ok(&mut self.state.as_mut().ok_or(Error::NotLoaded)?.2)
    }

    fn update_entries(&mut self, updates: &[EntryUpdate]) -> Result<(), Error> {
        apply_updates(self.project_mut()?, updates)
    }

    fn export_file(&self, terms: Option<&[Term]>) -> Result<ExportedFile, Error> {
        let (file_name, _, _) = self.state.as_ref().ok_or(Error::NotLoaded)?;
        Ok(ExportedFile {
            file_name: file_name.clone(),
            bytes: self.translated_html()?.into_bytes(),
            glossary: glossary_file(file_name, terms)?,
        })
    }

    fn format_data(&self) -> Result<serde_json::Value, Error> {
        let (file_name, parsed, _) = self.state.as_ref().ok_or(Error::NotLoaded)?;
        Ok(serde_json::json!({
            "fileName": file_name,
            "parsed": serde_json::to_value(parsed)?,
        }))
    }

    fn load_from_json(
        &mut self,
        project: TranslationProject,
        mut format_data: serde_json::Value,
    ) -> Result<(), Error> {
        let file_name = format_data
            .get("fileName")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| project.name.clone());
        let parsed: ParsedHtml = from_format_data(
            format_data
                .get_mut("parsed")
                .map(serde_json::Value::take)
                .unwrap_or_default(),
        )?;
        self.state = Some((file_name, parsed, project));
        Ok(())
    }
}

/// Detects HTML pages.
#[derive(Debug, Default)]
pub struct HtmlCodec;

impl Codec for HtmlCodec {
    fn format_id(&self) -> &'static str {
        FORMAT_ID
    }

    fn detect(&self, payload: &UploadPayload) -> Detection {
        let Some(file) = payload.as_single_file() else {
            return Detection::none();
        };
        let by_extension = matches!(file.extension().as_deref(), Some("html" | "htm" | "xhtml"));
        let head = file
            .text()
            .unwrap_or_default()
            .chars()
            .take(2048)
            .collect::<String>()
            .to_ascii_lowercase();
        let has_markup = head.contains("<!doctype html") || head.contains("<html");
        match (by_extension, has_markup) {
            (true, true) => Detection::new(1.0, "HTML extension and document markup"),
            (true, false) => Detection::new(0.8, "HTML extension"),
            (false, true) => Detection::new(0.7, "HTML document markup"),
            (false, false) => Detection::none(),
        }
    }

    fn new_client(&self) -> Box<dyn TranslationClient> {
        Box::new(HtmlClient::new())
    }
}
