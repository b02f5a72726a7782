//! Plain text, Markdown and DOCX: one entry per translatable paragraph,
//! id = the paragraph index.

use crate::{
    archive::{is_zip, read_zip},
    clients::{
        TranslationClient, apply_updates, from_format_data, single_resource, translations_by_index,
    },
    codec::{Codec, Detection},
    error::Error,
    formats::{
        docx::{DOCUMENT_XML_PATH, DocxPackage, parse_docx, render_docx},
        document::{DocumentKind, ParsedDocument, parse_markdown, parse_text},
    },
    glossary::{Term, glossary_file},
    types::{
        EntryMetadata, EntryUpdate, ExportedFile, ParagraphMetadata, TranslationEntry,
        TranslationProject, TranslationResource, UploadPayload, VirtualFile,
    },
};

pub const FORMAT_ID: &str = "document";

#[derive(Debug, Default)]
pub struct DocumentClient {
    state: Option<(String, ParsedDocument, TranslationProject)>,
}

impl DocumentClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> Result<&ParsedDocument, Error> {
        Ok(&self.state.as_ref().ok_or(Error::NotLoaded)?.1)
    }
}

fn is_markdown(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.ends_with(".md") || lower.ends_with(".markdown")
}

fn read_document(payload: &UploadPayload) -> Result<ParsedDocument, Error> {
    match payload {
        UploadPayload::Archive { tree, .. } => parse_docx(DocxPackage::from_tree(tree.clone())?),
        UploadPayload::SingleFile { file } if is_zip(&file.content) => {
            parse_docx(DocxPackage::from_bytes(&file.content)?)
        }
        UploadPayload::SingleFile { file } if file.extension().as_deref() == Some("docx") => Err(
            Error::UnsupportedPayload(format!("`{}` is not a zip archive", file.path)),
        ),
        UploadPayload::SingleFile { file } => {
            let text = file.text()?;
            Ok(if is_markdown(&file.path) {
                parse_markdown(&text)
            } else {
                parse_text(&text)
            })
        }
    }
}

fn build_project(file_name: &str, document: &ParsedDocument) -> TranslationProject {
    let mut resource = TranslationResource::new(file_name, file_name);
    for paragraph in document.translatable() {
        let mut entry = TranslationEntry::new(paragraph.index.to_string(), paragraph.text.clone());
        entry.metadata = EntryMetadata::Document(ParagraphMetadata {
            paragraph_index: paragraph.index,
            kind: paragraph.kind,
        });
        resource.add_entry(entry);
    }
    let mut project = TranslationProject::new(file_name);
    project.resources.push(resource);
    project
}

impl TranslationClient for DocumentClient {
    fn format_id(&self) -> &'static str {
        FORMAT_ID
    }

    fn load(&mut self, payload: &UploadPayload) -> Result<(), Error> {
        let document = read_document(payload)?;
        if document.translatable().next().is_none() {
            return Err(Error::NoTranslatableContent(
                "document has no text paragraphs".to_string(),
            ));
        }
        let file_name = payload.file_name().to_string();
        let project = build_project(&file_name, &document);
        self.state = Some((file_name, document, project));
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
        let (file_name, document, project) = self.state.as_ref().ok_or(Error::NotLoaded)?;
        let translations = translations_by_index(single_resource(project)?, |entry| match &entry
            .metadata
        {
            EntryMetadata::Document(meta) => Some(meta.paragraph_index),
            _ => None,
        });
        let bytes = match document.kind {
            DocumentKind::Docx => render_docx(document, &translations)?,
            DocumentKind::Text | DocumentKind::Markdown => {
                document.render_text(&translations).into_bytes()
            }
        };
        Ok(ExportedFile {
            file_name: file_name.clone(),
            bytes,
            glossary: glossary_file(file_name, terms)?,
        })
    }

    fn format_data(&self) -> Result<serde_json::Value, Error> {
        let (file_name, document, _) = self.state.as_ref().ok_or(Error::NotLoaded)?;
        Ok(serde_json::json!({
            "fileName": file_name,
            "document": serde_json::to_value(document)?,
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
        let document: ParsedDocument = from_format_data(
            format_data
                .get_mut("document")
                .map(serde_json::Value::take)
                .unwrap_or_default(),
        )?;
        if document.kind == DocumentKind::Docx && document.package.is_none() {
            return Err(Error::DataMismatch("stored DOCX document has no package".to_string()));
        }
        self.state = Some((file_name, document, project));
        Ok(())
    }
}

fn has_document_xml(members: &[VirtualFile]) -> bool {
    members.iter().any(|f| {
        f.path == DOCUMENT_XML_PATH || f.path.ends_with(&format!("/{}", DOCUMENT_XML_PATH))
    })
}

/// Detects text, Markdown and DOCX documents.
#[derive(Debug, Default)]
pub struct DocumentCodec;

impl Codec for DocumentCodec {
    fn format_id(&self) -> &'static str {
        FORMAT_ID
    }

    fn detect(&self, payload: &UploadPayload) -> Detection {
        match payload {
            UploadPayload::Archive { tree, .. } if has_document_xml(tree) => {
                Detection::new(1.0, "archive containing word/document.xml")
            }
            UploadPayload::Archive { .. } => Detection::none(),
            UploadPayload::SingleFile { file } => {
                let extension = file.extension();
                match extension.as_deref() {
                    Some("docx") if is_zip(&file.content) => {
                        match read_zip(&file.content) {
                            Ok(members) if has_document_xml(&members) => {
                                Detection::new(1.0, "DOCX package with word/document.xml")
                            }
                            _ => Detection::new(0.3, "DOCX extension, unreadable package"),
                        }
                    }
                    Some("docx") => Detection::new(0.3, "DOCX extension, not a zip"),
                    Some("md" | "markdown") if file.text().is_ok() => {
                        Detection::new(0.8, "Markdown extension")
                    }
                    Some("txt" | "text") if file.text().is_ok() => {
                        Detection::new(0.6, "text extension")
                    }
                    _ => Detection::none(),
                }
            }
        }
    }

    fn new_client(&self) -> Box<dyn TranslationClient> {
        Box::new(DocumentClient::new())
    }
}
