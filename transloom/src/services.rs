//! Collaborators the clients call through: the translation agent and the
//! project store. Neither is implemented by this crate beyond the in-memory
//! store used by tests and the CLI.

use std::{collections::HashMap, sync::Mutex};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    glossary::Term,
    types::{EntryUpdate, TranslationProject},
};

/// Which entries `translate` should send to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    /// Restrict to one resource.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Restrict to these entry ids.
    #[serde(default)]
    pub entry_ids: Option<Vec<String>>,
    /// Defaults to the project's first target language.
    #[serde(default)]
    pub target_language: Option<String>,
    /// Also send entries that already have a translation.
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub terms: Vec<Term>,
}

/// One entry as the agent sees it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentItem {
    pub resource_id: String,
    pub entry_id: String,
    pub source_text: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentBatch {
    pub source_language: String,
    pub target_language: String,
    pub items: Vec<AgentItem>,
    #[serde(default)]
    pub terms: Vec<Term>,
}

/// Produces translations for a batch of entries.
pub trait TranslationAgent: Send + Sync {
    fn translate(&self, batch: &AgentBatch) -> Result<Vec<EntryUpdate>, Error>;
}

/// What a client hands to a [`ProjectStore`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProject {
    pub format_id: String,
    pub project: TranslationProject,
    /// The client's native document, opaque to the store.
    pub format_data: serde_json::Value,
}

/// Persistence for projects. `save` returns the id to `load` it back with.
pub trait ProjectStore: Send + Sync {
    fn save(&self, project: &StoredProject) -> Result<String, Error>;
    fn load(&self, id: &str) -> Result<StoredProject, Error>;
}

/// Keeps projects in memory, keyed by project name.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: Mutex<HashMap<String, StoredProject>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.projects.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProjectStore for MemoryProjectStore {
    fn save(&self, project: &StoredProject) -> Result<String, Error> {
        let id = project.project.name.clone();
        self.projects
            .lock()
            .map_err(|_| Error::collaborator_error("project store lock poisoned", None))?
            .insert(id.clone(), project.clone());
        Ok(id)
    }

    fn load(&self, id: &str) -> Result<StoredProject, Error> {
        self.projects
            .lock()
            .map_err(|_| Error::collaborator_error("project store lock poisoned", None))?
            .get(id)
            .cloned()
            .ok_or_else(|| Error::collaborator_error(format!("no stored project `{}`", id), None))
    }
}
