//! Xcode localization bundles and bare XLIFF files. Each `<file>` of the
//! XLIFF becomes a resource, each `<trans-unit>` an entry.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    archive::{is_zip, read_zip, write_zip},
    clients::{TranslationClient, apply_updates, from_format_data},
    codec::{Codec, Detection},
    error::Error,
    formats::{
        xcloc::{XclocBundle, find_contents_member, find_xliff_member},
        xliff::{XliffDocument, parse_xliff, serialize_xliff},
    },
    glossary::{Term, glossary_file},
    types::{
        DEFAULT_SOURCE_LANGUAGE, EntryMetadata, EntryUpdate, ExportedFile, TranslationEntry,
        TranslationProject, TranslationResource, UploadPayload, VirtualFile, XliffUnitMetadata,
        normalize_language_tag,
    },
};

pub const FORMAT_ID: &str = "xcloc";

/// Where the XLIFF came from, which decides the export shape.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum XliffSource {
    Bundle {
        file_name: String,
        bundle: XclocBundle,
    },
    Standalone {
        file_name: String,
        document: XliffDocument,
    },
}

impl XliffSource {
    fn document(&self) -> &XliffDocument {
        match self {
            XliffSource::Bundle { bundle, .. } => &bundle.xliff,
            XliffSource::Standalone { document, .. } => document,
        }
    }

    fn document_mut(&mut self) -> &mut XliffDocument {
        match self {
            XliffSource::Bundle { bundle, .. } => &mut bundle.xliff,
            XliffSource::Standalone { document, .. } => document,
        }
    }

    fn file_name(&self) -> &str {
        match self {
            XliffSource::Bundle { file_name, .. } | XliffSource::Standalone { file_name, .. } => {
                file_name
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct XclocClient {
    state: Option<(XliffSource, TranslationProject)>,
}

impl XclocClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> Result<&XliffDocument, Error> {
        Ok(self.loaded()?.0.document())
    }

    fn loaded(&self) -> Result<&(XliffSource, TranslationProject), Error> {
        self.state.as_ref().ok_or(Error::NotLoaded)
    }
}

fn read_source(payload: &UploadPayload) -> Result<XliffSource, Error> {
    let file_name = payload.file_name().to_string();
    match payload {
        UploadPayload::Archive { tree, .. } => Ok(XliffSource::Bundle {
            file_name,
            bundle: XclocBundle::from_tree(tree)?,
        }),
        UploadPayload::SingleFile { file } if is_zip(&file.content) => Ok(XliffSource::Bundle {
            file_name,
            bundle: XclocBundle::from_tree(&read_zip(&file.content)?)?,
        }),
        UploadPayload::SingleFile { file } => match file.extension().as_deref() {
            Some("xliff" | "xlf") => Ok(XliffSource::Standalone {
                file_name,
                document: parse_xliff(&file.text()?)?,
            }),
            _ => Err(Error::UnsupportedPayload(format!(
                "`{}` is neither an xcloc bundle nor an XLIFF file",
                file_name
            ))),
        },
    }
}

fn build_project(source: &XliffSource) -> TranslationProject {
    let document = source.document();
    let mut project = TranslationProject::new(source.file_name());

    let (source_language, target_language) = match source {
        XliffSource::Bundle { bundle, .. } => (
            Some(bundle.contents.development_region.clone()),
            Some(bundle.contents.target_locale.clone()),
        ),
        XliffSource::Standalone { .. } => (None, None),
    };
    let first_file = document.files.first();
    project.source_language = source_language
        .or_else(|| first_file.map(|f| f.source_language.clone()))
        .filter(|l| !l.is_empty())
        .map(|l| normalize_language_tag(&l))
        .unwrap_or_else(|| DEFAULT_SOURCE_LANGUAGE.to_string());
    project.target_languages = target_language
        .or_else(|| first_file.map(|f| f.target_language.clone()))
        .filter(|l| !l.is_empty())
        .map(|l| normalize_language_tag(&l))
        .into_iter()
        .collect();

    let mut resource_ids = HashSet::new();
    for (file_index, file) in document.files.iter().enumerate() {
        let mut id = if file.original.is_empty() {
            format!("file-{}", file_index)
        } else {
            file.original.clone()
        };
        if !resource_ids.insert(id.clone()) {
            id = format!("{}#{}", id, file_index);
            resource_ids.insert(id.clone());
        }

        let mut resource = TranslationResource::new(id, file.original.clone());
        resource.source_language =
            (!file.source_language.is_empty()).then(|| normalize_language_tag(&file.source_language));
        resource.target_language =
            (!file.target_language.is_empty()).then(|| normalize_language_tag(&file.target_language));

        let mut entry_ids = HashSet::new();
        for (unit_index, unit) in file.units.iter().enumerate() {
            let mut id = unit.id.clone();
            if id.is_empty() || !entry_ids.insert(id.clone()) {
                id = format!("{}#{}", unit.id, unit_index);
                entry_ids.insert(id.clone());
            }
            let mut entry = TranslationEntry::new(id, unit.source.clone());
            entry.target_text = unit.target.clone().unwrap_or_default();
            entry.comment = unit.note.clone();
            entry.metadata = EntryMetadata::Xliff(XliffUnitMetadata {
                file_index,
                unit_index,
            });
            resource.add_entry(entry);
        }
        project.resources.push(resource);
    }
    project
}

fn sync_entry(document: &mut XliffDocument, entry: &TranslationEntry) -> Result<(), Error> {
    let EntryMetadata::Xliff(meta) = &entry.metadata else {
        return Err(Error::DataMismatch(format!("entry `{}` has no XLIFF metadata", entry.id)));
    };
    let unit = document
        .unit_mut(meta.file_index, meta.unit_index)
        .ok_or_else(|| Error::DataMismatch(format!("entry `{}` has no trans-unit", entry.id)))?;

    // Units keep their target element and state until the text changes.
    if unit.target.as_deref().unwrap_or_default() != entry.target_text {
        if entry.target_text.is_empty() {
            unit.target = unit.target.as_ref().map(|_| String::new());
            unit.target_state = None;
        } else {
            unit.target = Some(entry.target_text.clone());
            unit.target_state = Some("translated".to_string());
        }
    }
    unit.note = entry.comment.clone();
    Ok(())
}

impl TranslationClient for XclocClient {
    fn format_id(&self) -> &'static str {
        FORMAT_ID
    }

    fn load(&mut self, payload: &UploadPayload) -> Result<(), Error> {
        let source = read_source(payload)?;
        if source.document().unit_count() == 0 {
            return Err(Error::NoTranslatableContent("XLIFF has no trans-units".to_string()));
        }
        let project = build_project(&source);
        self.state = Some((source, project));
        Ok(())
    }

    fn project(&self) -> Result<&TranslationProject, Error> {
        Ok(&self.loaded()?.1)
    }

    fn project_mut(&mut self) -> Result<&mut TranslationProject, Error> {
        Ok(&mut self.state.as_mut().ok_or(Error::NotLoaded)?.1)
    }

    fn update_entries(&mut self, updates: &[EntryUpdate]) -> Result<(), Error> {
        let (source, project) = self.state.as_mut().ok_or(Error::NotLoaded)?;
        let mut updated = project.clone();
        apply_updates(&mut updated, updates)?;
        let mut document = source.document().clone();
        for update in updates {
            if let Some(entry) = updated.find_entry(&update.resource_id, &update.entry_id) {
                sync_entry(&mut document, entry)?;
            }
        }
        *source.document_mut() = document;
        *project = updated;
        Ok(())
    }

    fn export_file(&self, terms: Option<&[Term]>) -> Result<ExportedFile, Error> {
        let (source, _) = self.loaded()?;
        let bytes = match source {
            XliffSource::Bundle { bundle, .. } => write_zip(&bundle.export_tree()?)?,
            XliffSource::Standalone { document, .. } => serialize_xliff(document)?.into_bytes(),
        };
        Ok(ExportedFile {
            file_name: source.file_name().to_string(),
            bytes,
            glossary: glossary_file(source.file_name(), terms)?,
        })
    }

    fn format_data(&self) -> Result<serde_json::Value, Error> {
        serde_json::to_value(&self.loaded()?.0).map_err(Error::Parse)
    }

    fn load_from_json(
        &mut self,
        project: TranslationProject,
        format_data: serde_json::Value,
    ) -> Result<(), Error> {
        let source: XliffSource = from_format_data(format_data)?;
        self.state = Some((source, project));
        Ok(())
    }
}

fn has_xliff_root(file: &VirtualFile) -> bool {
    file.text().is_ok_and(|t| t.contains("<xliff"))
}

/// Detects xcloc bundles (as archives or zipped single files) and XLIFF files.
#[derive(Debug, Default)]
pub struct XclocCodec;

impl Codec for XclocCodec {
    fn format_id(&self) -> &'static str {
        FORMAT_ID
    }

    fn detect(&self, payload: &UploadPayload) -> Detection {
        let named_xcloc = {
            let name = payload.file_name().to_ascii_lowercase();
            name.ends_with(".xcloc") || name.ends_with(".xcloc.zip")
        };
        match payload {
            UploadPayload::Archive { tree, .. } => {
                let xliff = find_xliff_member(tree);
                match (find_contents_member(tree).is_some(), xliff.is_some()) {
                    (true, true) => Detection::new(1.0, "contents.json and XLIFF member"),
                    (false, true) if named_xcloc => {
                        Detection::new(0.7, "xcloc archive with XLIFF but no contents.json")
                    }
                    (false, true) => Detection::new(0.3, "archive containing an XLIFF file"),
                    _ if named_xcloc => Detection::new(0.5, "xcloc name only"),
                    _ => Detection::none(),
                }
            }
            UploadPayload::SingleFile { file } => {
                let extension = file.extension();
                if is_zip(&file.content) {
                    return if named_xcloc {
                        Detection::new(0.8, "zipped xcloc bundle")
                    } else {
                        Detection::none()
                    };
                }
                match (matches!(extension.as_deref(), Some("xliff" | "xlf")), has_xliff_root(file)) {
                    (true, true) => Detection::new(0.95, "XLIFF extension and root element"),
                    (false, true) => Detection::new(0.6, "XLIFF root element"),
                    (true, false) => Detection::new(0.5, "XLIFF extension only"),
                    (false, false) => Detection::none(),
                }
            }
        }
    }

    fn new_client(&self) -> Box<dyn TranslationClient> {
        Box::new(XclocClient::new())
    }
}
