//! gettext catalogs: one resource per file, one entry per message, and one
//! entry per plural form for plural messages (`{index}:plural:{form}`).

use serde::{Deserialize, Serialize};

use crate::{
    clients::{TranslationClient, apply_updates, from_format_data, single_file_text},
    codec::{Codec, Detection},
    error::Error,
    formats::po::{PoDocument, PoMsgstr, parse_po, serialize_po},
    glossary::{Term, glossary_file},
    hash_ids::has_hash_based_msgids,
    merge::{self, MergeStats},
    plural_rules::category_for_index,
    types::{
        DEFAULT_SOURCE_LANGUAGE, EntryMetadata, EntryUpdate, ExportedFile, PoEntryMetadata,
        TranslationEntry, TranslationProject, TranslationResource, UploadPayload,
        normalize_language_tag,
    },
};

pub const FORMAT_ID: &str = "po";

/// Project metadata key set to `"true"` when msgids look like hash keys.
pub const HASH_BASED_MSGIDS: &str = "hash_based_msgids";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct PoState {
    file_name: String,
    document: PoDocument,
    /// The catalog text as uploaded, for the reference self-check.
    original_text: String,
}

#[derive(Debug, Default)]
pub struct PoClient {
    state: Option<(PoState, TranslationProject)>,
}

impl PoClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> Result<&PoDocument, Error> {
        Ok(&self.loaded()?.0.document)
    }

    fn loaded(&self) -> Result<&(PoState, TranslationProject), Error> {
        self.state.as_ref().ok_or(Error::NotLoaded)
    }

    /// Whether the loaded catalog is keyed by hashes and needs a reference.
    pub fn has_hash_based_msgids(&self) -> Result<bool, Error> {
        Ok(has_hash_based_msgids(self.document()?))
    }

    /// Merges a new revision of the catalog into the current translations.
    ///
    /// With `reference_text`, source texts are then taken from that catalog.
    /// On error nothing changes.
    pub fn update_from_po(
        &mut self,
        new_text: &str,
        reference_text: Option<&str>,
    ) -> Result<MergeStats, Error> {
        let (state, project) = self.loaded()?;
        let new_doc = parse_po(new_text);
        if new_doc.entries.is_empty() {
            return Err(Error::NoTranslatableContent("no PO entries found".to_string()));
        }

        let prior = merge::snapshot(project, &state.document);
        let (merged, stats) = merge::merge_documents(&prior, new_doc);

        let mut rebuilt = build_project(&state.file_name, &merged);
        if merged.language().is_none() {
            rebuilt.target_languages = project.target_languages.clone();
        }
        rebuilt.source_language = project.source_language.clone();
        if let Some(reference) = reference_text {
            merge::apply_reference_document(&mut rebuilt, &merged, new_text, reference)?;
        }

        let state = PoState {
            file_name: state.file_name.clone(),
            document: merged,
            original_text: new_text.to_string(),
        };
        self.state = Some((state, rebuilt));
        Ok(stats)
    }

    /// Shows readable text from `reference_text` in place of hash msgids.
    /// Returns the number of entries that matched.
    pub fn apply_reference_document(&mut self, reference_text: &str) -> Result<usize, Error> {
        let (state, project) = self.state.as_mut().ok_or(Error::NotLoaded)?;
        merge::apply_reference_document(project, &state.document, &state.original_text, reference_text)
    }
}

/// Builds the project for a catalog.
pub fn build_project(file_name: &str, doc: &PoDocument) -> TranslationProject {
    let language = doc.language();
    let nplurals = doc.nplurals();
    let mut resource = TranslationResource::new(file_name, file_name);
    resource.target_language = language.clone();

    for (po_index, po_entry) in doc.entries.iter().enumerate() {
        let metadata = |plural_index| {
            EntryMetadata::Po(PoEntryMetadata {
                po_index,
                plural_index,
                msgid: po_entry.msgid.clone(),
                flags: po_entry.flags.clone(),
                references: po_entry.comments.references.clone(),
                extracted_comments: po_entry.comments.extracted.clone(),
            })
        };
        let comment = (!po_entry.comments.translator.is_empty())
            .then(|| po_entry.comments.translator.join("\n"));

        match &po_entry.msgid_plural {
            Some(msgid_plural) => {
                for form in 0..nplurals {
                    let source = if form == 0 { &po_entry.msgid } else { msgid_plural };
                    let mut entry =
                        TranslationEntry::new(format!("{}:plural:{}", po_index, form), source.clone());
                    entry.target_text = po_entry.msgstr.form(form).unwrap_or_default().to_string();
                    entry.plural_form =
                        Some(category_for_index(form, nplurals, language.as_deref()));
                    entry.context = po_entry.msgctxt.clone();
                    entry.comment = comment.clone();
                    entry.metadata = metadata(Some(form));
                    resource.add_entry(entry);
                }
            }
            None => {
                let mut entry = TranslationEntry::new(po_index.to_string(), po_entry.msgid.clone());
                entry.target_text = po_entry.msgstr.singular().unwrap_or_default().to_string();
                entry.context = po_entry.msgctxt.clone();
                entry.comment = comment;
                entry.metadata = metadata(None);
                resource.add_entry(entry);
            }
        }
    }

    let mut project = TranslationProject::new(file_name);
    project.source_language = doc
        .header
        .as_ref()
        .and_then(|h| h.field("X-Source-Language"))
        .map(|l| normalize_language_tag(&l))
        .unwrap_or_else(|| DEFAULT_SOURCE_LANGUAGE.to_string());
    project.target_languages = language.into_iter().collect();
    project.metadata.insert(
        HASH_BASED_MSGIDS.to_string(),
        has_hash_based_msgids(doc).to_string(),
    );
    project.resources.push(resource);
    project
}

/// Writes one project entry back into the catalog.
fn sync_entry(doc: &mut PoDocument, entry: &TranslationEntry) -> Result<(), Error> {
    let EntryMetadata::Po(meta) = &entry.metadata else {
        return Err(Error::DataMismatch(format!("entry `{}` has no PO metadata", entry.id)));
    };
    let po_entry = doc.entries.get_mut(meta.po_index).ok_or_else(|| {
        Error::DataMismatch(format!("entry `{}` points past the catalog", entry.id))
    })?;

    match meta.plural_index {
        Some(form) => {
            if !matches!(po_entry.msgstr, PoMsgstr::Plural(_)) {
                po_entry.msgstr = PoMsgstr::Plural(Default::default());
            }
            if let PoMsgstr::Plural(forms) = &mut po_entry.msgstr {
                forms.insert(form, entry.target_text.clone());
            }
        }
        None => po_entry.msgstr = PoMsgstr::Singular(entry.target_text.clone()),
    }
    po_entry.comments.translator = entry
        .comment
        .as_deref()
        .map(|c| c.lines().map(str::to_string).collect())
        .unwrap_or_default();
    Ok(())
}

impl TranslationClient for PoClient {
    fn format_id(&self) -> &'static str {
        FORMAT_ID
    }

    fn load(&mut self, payload: &UploadPayload) -> Result<(), Error> {
        let text = single_file_text(payload, "PO")?;
        let document = parse_po(&text);
        if document.entries.is_empty() {
            return Err(Error::NoTranslatableContent("no PO entries found".to_string()));
        }
        let file_name = payload.file_name().to_string();
        let project = build_project(&file_name, &document);
        self.state = Some((
            PoState {
                file_name,
                document,
                original_text: text,
            },
            project,
        ));
        Ok(())
    }

    fn project(&self) -> Result<&TranslationProject, Error> {
        Ok(&self.loaded()?.1)
    }

    fn project_mut(&mut self) -> Result<&mut TranslationProject, Error> {
        Ok(&mut self.state.as_mut().ok_or(Error::NotLoaded)?.1)
    }

    fn update_entries(&mut self, updates: &[EntryUpdate]) -> Result<(), Error> {
        let (state, project) = self.state.as_mut().ok_or(Error::NotLoaded)?;
        let mut updated = project.clone();
        apply_updates(&mut updated, updates)?;
        let mut document = state.document.clone();
        for update in updates {
            if let Some(entry) = updated.find_entry(&update.resource_id, &update.entry_id) {
                sync_entry(&mut document, entry)?;
            }
        }
        state.document = document;
        *project = updated;
        Ok(())
    }

    fn export_file(&self, terms: Option<&[Term]>) -> Result<ExportedFile, Error> {
        let (state, _) = self.loaded()?;
        Ok(ExportedFile {
            file_name: state.file_name.clone(),
            bytes: serialize_po(&state.document).into_bytes(),
            glossary: glossary_file(&state.file_name, terms)?,
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
        let state: PoState = from_format_data(format_data)?;
        self.state = Some((state, project));
        Ok(())
    }
}

/// Detects gettext catalogs.
#[derive(Debug, Default)]
pub struct PoCodec;

impl Codec for PoCodec {
    fn format_id(&self) -> &'static str {
        FORMAT_ID
    }

    fn detect(&self, payload: &UploadPayload) -> Detection {
        let Some(file) = payload.as_single_file() else {
            return Detection::none();
        };
        let by_extension = matches!(file.extension().as_deref(), Some("po" | "pot"));
        let text = file.text().unwrap_or_default();
        let directive = |keyword: &str| {
            text.lines()
                .any(|l| l.trim_start().strip_prefix(keyword).is_some_and(|r| r.starts_with([' ', '['])))
        };
        let has_msgid = directive("msgid");
        let has_msgstr = directive("msgstr");

        match (by_extension, has_msgid && has_msgstr) {
            (true, true) => Detection::new(1.0, "PO extension with msgid and msgstr directives"),
            (false, true) => Detection::new(0.8, "msgid and msgstr directives"),
            (true, false) if has_msgid || has_msgstr => {
                Detection::new(0.7, "PO extension with partial directives")
            }
            (true, false) => Detection::new(0.6, "PO extension only"),
            (false, false) => Detection::none(),
        }
    }

    fn new_client(&self) -> Box<dyn TranslationClient> {
        Box::new(PoClient::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryPatch, PluralCategory};
    use indoc::indoc;

    const CATALOG: &str = indoc! {r#"
        msgid ""
        msgstr ""
        "Language: fr\n"
        "Plural-Forms: nplurals=2; plural=(n > 1);\n"

        # Shown on the home screen
        msgid "Hello"
        msgstr "Bonjour"

        msgctxt "menu"
        msgid "Open"
        msgstr ""

        msgid "%d file"
        msgid_plural "%d files"
        msgstr[0] ""
        msgstr[1] ""
    "#};

    fn loaded() -> PoClient {
        let mut client = PoClient::new();
        client
            .load(&UploadPayload::single_file("fr.po", CATALOG.as_bytes().to_vec()))
            .unwrap();
        client
    }

    #[test]
    fn test_projection() {
        let client = loaded();
        let project = client.project().unwrap();
        assert_eq!(project.target_languages, vec!["fr".to_string()]);
        assert_eq!(project.metadata.get(HASH_BASED_MSGIDS).map(String::as_str), Some("false"));

        let resource = client.resource("fr.po").unwrap();
        let ids: Vec<_> = resource.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2:plural:0", "2:plural:1"]);
        assert_eq!(resource.entries[0].target_text, "Bonjour");
        assert_eq!(resource.entries[0].comment.as_deref(), Some("Shown on the home screen"));
        assert_eq!(resource.entries[1].context.as_deref(), Some("menu"));
        assert_eq!(resource.entries[2].plural_form, Some(PluralCategory::One));
        assert_eq!(resource.entries[3].plural_form, Some(PluralCategory::Other));
        assert_eq!(resource.entries[3].source_text, "%d files");
    }

    #[test]
    fn test_update_syncs_document() {
        let mut client = loaded();
        client
            .update_entry("fr.po", "2:plural:1", &EntryPatch::target("%d fichiers"))
            .unwrap();
        client
            .update_entry("fr.po", "1", &EntryPatch::target("Ouvrir"))
            .unwrap();
        let exported = String::from_utf8(client.export_file(None).unwrap().bytes).unwrap();
        assert!(exported.contains("msgctxt \"menu\"\nmsgid \"Open\"\nmsgstr \"Ouvrir\""));
        assert!(exported.contains("msgstr[1] \"%d fichiers\""));
    }

    #[test]
    fn test_failed_batch_changes_nothing() {
        let mut client = loaded();
        let updates = vec![
            EntryUpdate {
                resource_id: "fr.po".to_string(),
                entry_id: "1".to_string(),
                patch: EntryPatch::target("Ouvrir"),
            },
            EntryUpdate {
                resource_id: "fr.po".to_string(),
                entry_id: "42".to_string(),
                patch: EntryPatch::target("?"),
            },
        ];
        assert!(client.update_entries(&updates).is_err());
        assert_eq!(client.project().unwrap().find_entry("fr.po", "1").unwrap().target_text, "");
        assert_eq!(client.document().unwrap().entries[1].msgstr.singular(), Some(""));
    }

    #[test]
    fn test_load_rejects_archives_and_empty_catalogs() {
        let mut client = PoClient::new();
        assert!(matches!(
            client.load(&UploadPayload::archive("x.zip", Vec::new())),
            Err(Error::UnsupportedPayload(_))
        ));
        assert!(matches!(
            client.load(&UploadPayload::single_file("x.po", b"# empty\n".to_vec())),
            Err(Error::NoTranslatableContent(_))
        ));
        assert!(matches!(client.project(), Err(Error::NotLoaded)));
    }

    #[test]
    fn test_detection_scores() {
        let codec = PoCodec;
        let full = UploadPayload::single_file("fr.po", CATALOG.as_bytes().to_vec());
        assert_eq!(codec.detect(&full).score, 1.0);
        let bare = UploadPayload::single_file("fr.po", b"".to_vec());
        let score = codec.detect(&bare).score;
        assert!((0.5..=0.9).contains(&score));
        let other = UploadPayload::single_file("notes.txt", b"hello".to_vec());
        assert_eq!(codec.detect(&other).score, 0.0);
    }

    #[test]
    fn test_format_data_round_trip() {
        let mut client = loaded();
        client
            .update_entry("fr.po", "1", &EntryPatch::target("Ouvrir"))
            .unwrap();
        let data = client.format_data().unwrap();
        let project = client.project().unwrap().clone();

        let mut restored = PoClient::new();
        restored.load_from_json(project, data).unwrap();
        assert_eq!(
            restored.export_file(None).unwrap().bytes,
            client.export_file(None).unwrap().bytes
        );
    }
}
