//! Clients project a native document into a [`TranslationProject`] and keep
//! the two in lockstep while entries are edited.
//!
//! Every client owns its state exclusively. `load`, `load_from_json` and the
//! PO merge build the new state first and replace the old one only on
//! success, so a failed call leaves the client as it was.

pub mod document;
pub mod html;
pub mod po;
pub mod subtitle;
pub mod xcloc;

use std::collections::BTreeMap;

pub use document::{DocumentClient, DocumentCodec};
pub use html::{HtmlClient, HtmlCodec};
pub use po::{PoClient, PoCodec};
pub use subtitle::{SrtCodec, SubtitleClient, VttCodec};
pub use xcloc::{XclocClient, XclocCodec};

use crate::{
    error::Error,
    glossary::Term,
    services::{AgentBatch, AgentItem, ProjectStore, StoredProject, TranslateRequest, TranslationAgent},
    types::{
        EntryPatch, EntryUpdate, ExportedFile, TranslationEntry, TranslationProject,
        TranslationResource, UploadPayload,
    },
};

/// The contract editors and agents use to work on a loaded file.
///
/// The trait is object safe; the registry hands out `Box<dyn TranslationClient>`.
pub trait TranslationClient: Send {
    /// Id of the codec that created this client (`"po"`, `"xcloc"`, ...).
    fn format_id(&self) -> &'static str;

    /// Parses `payload` and builds the project. Replaces any earlier state.
    fn load(&mut self, payload: &UploadPayload) -> Result<(), Error>;

    fn project(&self) -> Result<&TranslationProject, Error>;

    /// Mutable access for callers that adjust project-level fields such as
    /// languages. Entry edits must go through [`Self::update_entries`].
    fn project_mut(&mut self) -> Result<&mut TranslationProject, Error>;

    fn resource(&self, id: &str) -> Result<&TranslationResource, Error> {
        self.project()?
            .find_resource(id)
            .ok_or_else(|| Error::InvalidResource(format!("no resource `{}`", id)))
    }

    fn source_language(&self) -> Result<String, Error> {
        Ok(self.project()?.source_language.clone())
    }

    fn target_languages(&self) -> Result<Vec<String>, Error> {
        Ok(self.project()?.target_languages.clone())
    }

    fn update_entry(
        &mut self,
        resource_id: &str,
        entry_id: &str,
        patch: &EntryPatch,
    ) -> Result<(), Error> {
        self.update_entries(&[EntryUpdate {
            resource_id: resource_id.to_string(),
            entry_id: entry_id.to_string(),
            patch: patch.clone(),
        }])
    }

    /// Applies all updates, or none if any addresses an unknown entry.
    fn update_entries(&mut self, updates: &[EntryUpdate]) -> Result<(), Error>;

    /// Sends the selected entries to `agent` and applies what comes back.
    /// Returns the number of entries updated.
    fn translate(
        &mut self,
        agent: &dyn TranslationAgent,
        request: &TranslateRequest,
    ) -> Result<usize, Error> {
        let batch = agent_batch(self.project()?, request)?;
        if batch.items.is_empty() {
            return Ok(0);
        }
        let updates = agent.translate(&batch)?;
        let allowed: std::collections::HashSet<(&str, &str)> = batch
            .items
            .iter()
            .map(|i| (i.resource_id.as_str(), i.entry_id.as_str()))
            .collect();
        if let Some(stray) = updates
            .iter()
            .find(|u| !allowed.contains(&(u.resource_id.as_str(), u.entry_id.as_str())))
        {
            return Err(Error::collaborator_error(
                format!(
                    "agent returned entry `{}` of `{}` which was not requested",
                    stray.entry_id, stray.resource_id
                ),
                None,
            ));
        }
        self.update_entries(&updates)?;
        tracing::debug!(count = updates.len(), "applied agent translations");
        Ok(updates.len())
    }

    /// Serializes the current state back into the native format.
    fn export_file(&self, terms: Option<&[Term]>) -> Result<ExportedFile, Error>;

    fn save(&self, store: &dyn ProjectStore) -> Result<String, Error> {
        store.save(&StoredProject {
            format_id: self.format_id().to_string(),
            project: self.project()?.clone(),
            format_data: self.format_data()?,
        })
    }

    fn open(&mut self, store: &dyn ProjectStore, id: &str) -> Result<(), Error> {
        let stored = store.load(id)?;
        if stored.format_id != self.format_id() {
            return Err(Error::DataMismatch(format!(
                "project `{}` was saved by the `{}` client, not `{}`",
                id,
                stored.format_id,
                self.format_id()
            )));
        }
        self.load_from_json(stored.project, stored.format_data)
    }

    /// The native document as JSON, for storage next to the project.
    fn format_data(&self) -> Result<serde_json::Value, Error>;

    /// Restores a project and the native document saved by [`Self::format_data`].
    fn load_from_json(
        &mut self,
        project: TranslationProject,
        format_data: serde_json::Value,
    ) -> Result<(), Error>;
}

/// Checks every update, then applies them all to `project`.
pub(crate) fn apply_updates(
    project: &mut TranslationProject,
    updates: &[EntryUpdate],
) -> Result<(), Error> {
    for update in updates {
        if project
            .find_entry(&update.resource_id, &update.entry_id)
            .is_none()
        {
            return Err(Error::entry_not_found(&update.resource_id, &update.entry_id));
        }
    }
    for update in updates {
        if let Some(entry) = project.find_entry_mut(&update.resource_id, &update.entry_id) {
            entry.apply_patch(&update.patch);
        }
    }
    Ok(())
}

/// Translations of a resource keyed by the index its entries were built from.
pub(crate) fn translations_by_index(
    resource: &TranslationResource,
    index_of: impl Fn(&TranslationEntry) -> Option<usize>,
) -> BTreeMap<usize, String> {
    resource
        .entries
        .iter()
        .filter(|e| e.is_translated())
        .filter_map(|e| Some((index_of(e)?, e.target_text.clone())))
        .collect()
}

/// The only resource of a single-file client.
pub(crate) fn single_resource(project: &TranslationProject) -> Result<&TranslationResource, Error> {
    project
        .resources
        .first()
        .ok_or_else(|| Error::InvalidResource("project has no resources".to_string()))
}

/// Reads the text of a single-file payload, rejecting archives.
pub(crate) fn single_file_text(payload: &UploadPayload, format: &str) -> Result<String, Error> {
    let file = payload.as_single_file().ok_or_else(|| {
        Error::UnsupportedPayload(format!("{} expects a single file, got an archive", format))
    })?;
    file.text()
}

pub(crate) fn from_format_data<T: serde::de::DeserializeOwned>(
    format_data: serde_json::Value,
) -> Result<T, Error> {
    serde_json::from_value(format_data).map_err(Error::Parse)
}

fn agent_batch(project: &TranslationProject, request: &TranslateRequest) -> Result<AgentBatch, Error> {
    let target_language = request
        .target_language
        .clone()
        .or_else(|| project.target_languages.first().cloned())
        .ok_or_else(|| Error::validation_error("no target language to translate into"))?;

    if let Some(resource_id) = &request.resource_id
        && project.find_resource(resource_id).is_none()
    {
        return Err(Error::InvalidResource(format!("no resource `{}`", resource_id)));
    }

    let mut items = Vec::new();
    for resource in &project.resources {
        if request.resource_id.as_ref().is_some_and(|id| id != &resource.id) {
            continue;
        }
        for entry in &resource.entries {
            if let Some(ids) = &request.entry_ids
                && !ids.contains(&entry.id)
            {
                continue;
            }
            if entry.is_translated() && !request.overwrite {
                continue;
            }
            items.push(AgentItem {
                resource_id: resource.id.clone(),
                entry_id: entry.id.clone(),
                source_text: entry.source_text.clone(),
                context: entry.context.clone(),
                comment: entry.comment.clone(),
                max_length: entry.max_length,
            });
        }
    }

    Ok(AgentBatch {
        source_language: project.source_language.clone(),
        target_language,
        items,
        terms: request.terms.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> TranslationProject {
        let mut resource = TranslationResource::new("r", "r.txt");
        resource.add_entry(TranslationEntry::new("0", "One"));
        let mut done = TranslationEntry::new("1", "Two");
        done.target_text = "Deux".to_string();
        resource.add_entry(done);
        let mut project = TranslationProject::new("r.txt");
        project.target_languages = vec!["fr".to_string()];
        project.resources.push(resource);
        project
    }

    #[test]
    fn test_apply_updates_is_all_or_nothing() {
        let mut project = project();
        let updates = vec![
            EntryUpdate {
                resource_id: "r".to_string(),
                entry_id: "0".to_string(),
                patch: EntryPatch::target("Un"),
            },
            EntryUpdate {
                resource_id: "r".to_string(),
                entry_id: "9".to_string(),
                patch: EntryPatch::target("Neuf"),
            },
        ];
        assert!(matches!(
            apply_updates(&mut project, &updates),
            Err(Error::EntryNotFound { .. })
        ));
        assert_eq!(project.find_entry("r", "0").unwrap().target_text, "");

        apply_updates(&mut project, &updates[..1]).unwrap();
        assert_eq!(project.find_entry("r", "0").unwrap().target_text, "Un");
    }

    #[test]
    fn test_agent_batch_skips_translated() {
        let batch = agent_batch(&project(), &TranslateRequest::default()).unwrap();
        assert_eq!(batch.target_language, "fr");
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.items[0].entry_id, "0");

        let request = TranslateRequest {
            overwrite: true,
            ..TranslateRequest::default()
        };
        assert_eq!(agent_batch(&project(), &request).unwrap().items.len(), 2);
    }

    #[test]
    fn test_agent_batch_needs_target_language() {
        let mut project = project();
        project.target_languages.clear();
        assert!(matches!(
            agent_batch(&project, &TranslateRequest::default()),
            Err(Error::Validation(_))
        ));
    }
}
