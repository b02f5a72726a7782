//! Reconciling a new PO revision with the translations already made.
//!
//! Entries are matched across revisions by [`PoKey`] (context + msgid).
//! Translations carry over only between entries of the same shape: an entry
//! that turned from singular into plural, or back, is a new unit.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    formats::po::{PoDocument, PoKey, PoMsgstr, parse_po},
    hash_ids::has_hash_based_msgstrs,
    types::{EntryMetadata, TranslationProject},
};

/// Outcome of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct MergeStats {
    /// Keys only in the new document.
    pub added: usize,
    /// Keys only in the old document.
    pub removed: usize,
    /// Keys in both whose translation was carried over.
    pub preserved: usize,
    /// Repeated occurrences of a key within the new document. They take the
    /// same translation as the first occurrence.
    #[serde(default)]
    pub duplicates: usize,
    /// Entries in the new document.
    pub total: usize,
}

/// Translation state of one entry before the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorTranslation {
    pub plural: bool,
    pub msgstr: PoMsgstr,
    pub translator_comments: Vec<String>,
}

/// Splits a PO entry id into `(po_index, plural_index)`.
///
/// `"4"` gives `(4, None)` and `"4:plural:1"` gives `(4, Some(1))`.
pub fn parse_entry_id(id: &str) -> Option<(usize, Option<usize>)> {
    match id.split_once(":plural:") {
        Some((index, form)) => Some((index.parse().ok()?, Some(form.parse().ok()?))),
        None => Some((id.parse().ok()?, None)),
    }
}

/// Rebuilds per-key translations from the live project, using the document
/// for keys and plural shape.
pub fn snapshot(project: &TranslationProject, doc: &PoDocument) -> HashMap<PoKey, PriorTranslation> {
    let mut prior: HashMap<PoKey, PriorTranslation> = HashMap::new();

    for entry in project.entries() {
        let Some((po_index, plural_index)) = parse_entry_id(&entry.id) else {
            tracing::debug!(id = %entry.id, "entry id is not a PO index");
            continue;
        };
        let Some(po_entry) = doc.entries.get(po_index) else {
            continue;
        };

        let slot = prior.entry(po_entry.key()).or_insert_with(|| PriorTranslation {
            plural: po_entry.is_plural(),
            msgstr: if po_entry.is_plural() {
                PoMsgstr::Plural(Default::default())
            } else {
                PoMsgstr::Missing
            },
            translator_comments: entry
                .comment
                .as_deref()
                .map(|c| c.lines().map(str::to_string).collect())
                .unwrap_or_default(),
        });

        match (&mut slot.msgstr, plural_index) {
            (PoMsgstr::Plural(forms), Some(form)) => {
                forms.insert(form, entry.target_text.clone());
            }
            (msgstr @ PoMsgstr::Missing, None) => {
                *msgstr = PoMsgstr::Singular(entry.target_text.clone());
            }
            // Duplicate keys: the first occurrence wins.
            _ => {}
        }
    }
    prior
}

/// Applies prior translations to `new_doc`.
pub fn merge_documents(
    prior: &HashMap<PoKey, PriorTranslation>,
    mut new_doc: PoDocument,
) -> (PoDocument, MergeStats) {
    let mut stats = MergeStats {
        total: new_doc.entries.len(),
        ..MergeStats::default()
    };
    let mut seen: HashSet<PoKey> = HashSet::new();

    for entry in &mut new_doc.entries {
        let key = entry.key();
        let first = seen.insert(key.clone());
        if !first {
            tracing::warn!(key = %key, "duplicate key in new revision");
            stats.duplicates += 1;
        }
        let Some(old) = prior.get(&key) else {
            if first {
                stats.added += 1;
            }
            continue;
        };
        if old.plural != entry.is_plural() {
            tracing::debug!(key = %key, "plural shape changed; translation not carried over");
            continue;
        }
        if !old.msgstr.has_translation() {
            continue;
        }

        entry.msgstr = match (&entry.msgstr, &old.msgstr) {
            (PoMsgstr::Plural(new_forms), PoMsgstr::Plural(old_forms)) => {
                let mut forms = new_forms.clone();
                for (index, value) in old_forms {
                    if !value.is_empty() {
                        forms.insert(*index, value.clone());
                    }
                }
                PoMsgstr::Plural(forms)
            }
            (_, carried) => carried.clone(),
        };
        if entry.comments.translator.is_empty() {
            entry.comments.translator = old.translator_comments.clone();
        }
        if first {
            stats.preserved += 1;
        }
    }

    stats.removed = prior.keys().filter(|k| !seen.contains(*k)).count();
    tracing::info!(
        added = stats.added,
        removed = stats.removed,
        preserved = stats.preserved,
        duplicates = stats.duplicates,
        total = stats.total,
        "merged PO revision"
    );
    (new_doc, stats)
}

/// Rewrites `source_text` of project entries from a reference catalog whose
/// msgstr values are readable text. Returns how many entries matched.
///
/// `uploaded_text` is the catalog the project was loaded from; a reference
/// identical to it is rejected. The project is left untouched on error.
pub fn apply_reference_document(
    project: &mut TranslationProject,
    doc: &PoDocument,
    uploaded_text: &str,
    reference_text: &str,
) -> Result<usize, Error> {
    if reference_text.trim() == uploaded_text.trim() {
        return Err(reject(
            "the reference file is the same as the uploaded file; upload a catalog whose translations are readable source text",
        ));
    }
    let reference = parse_po(reference_text);
    if reference.entries.is_empty() {
        return Err(reject("the reference file has no entries"));
    }
    if has_hash_based_msgstrs(&reference) {
        return Err(reject(
            "the reference file's translations are hash keys too; it must carry readable text",
        ));
    }

    let lookup: HashMap<PoKey, &PoMsgstr> = reference
        .entries
        .iter()
        .filter(|e| e.msgstr.has_translation())
        .map(|e| (e.key(), &e.msgstr))
        .collect();

    let mut updated = project.clone();
    let mut matched = 0;
    for resource in &mut updated.resources {
        for entry in &mut resource.entries {
            let EntryMetadata::Po(meta) = &entry.metadata else {
                continue;
            };
            let Some(po_entry) = doc.entries.get(meta.po_index) else {
                continue;
            };
            let Some(msgstr) = lookup.get(&po_entry.key()) else {
                continue;
            };
            let text = match (msgstr, meta.plural_index) {
                (PoMsgstr::Singular(s), _) => s.as_str(),
                (PoMsgstr::Plural(forms), None | Some(0)) => {
                    forms.get(&0).map(String::as_str).unwrap_or_default()
                }
                (PoMsgstr::Plural(forms), Some(_)) => {
                    forms.values().next_back().map(String::as_str).unwrap_or_default()
                }
                (PoMsgstr::Missing, _) => "",
            };
            if !text.is_empty() {
                entry.source_text = text.to_string();
                matched += 1;
            }
        }
    }

    if matched == 0 {
        return Err(reject(
            "no entries matched the reference file; check that it comes from the same catalog",
        ));
    }
    tracing::info!(matched, "applied reference catalog");
    *project = updated;
    Ok(matched)
}

fn reject(message: &str) -> Error {
    tracing::warn!(reason = message, "reference catalog rejected");
    Error::InvalidReference(message.to_string())
}
