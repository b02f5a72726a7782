#![forbid(unsafe_code)]
//! Localization file codecs behind one translation model.
//!
//! Loads gettext catalogs, Xcode `.xcloc` bundles (and bare XLIFF), SRT and
//! WebVTT subtitles, HTML pages, and text/Markdown/DOCX documents into a
//! [`TranslationProject`], lets callers edit targets entry by entry, and
//! writes each file back in its own format with the edits applied.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use transloom::{EntryPatch, LoadOptions, TranslationClient, load_path};
//!
//! let mut client = load_path("locale/fr.po", &LoadOptions::new())?;
//! let resource_id = client.project()?.resources[0].id.clone();
//! client.update_entry(&resource_id, "0", &EntryPatch::target("Bonjour"))?;
//! let exported = client.export_file(None)?;
//! std::fs::write(&exported.file_name, &exported.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Supported Formats
//!
//! - **gettext `.po` / `.pot`**: singular and plural entries, contexts, comments
//! - **`.xcloc` / XLIFF 1.2**: Xcode localization bundles or standalone XLIFF
//! - **SRT / WebVTT**: one entry per cue, timings preserved
//! - **HTML**: text blocks and translatable attributes, sanitized on export
//! - **Text / Markdown / DOCX**: one entry per paragraph
//!
//! Gettext catalogs also support merging a fresh template over existing
//! translations ([`clients::PoClient::update_from_po`]) and importing
//! translations from a reference catalog keyed by hashed msgids.

pub mod archive;
pub mod clients;
pub mod codec;
pub mod error;
pub mod escape;
pub mod formats;
pub mod glossary;
pub mod hash_ids;
pub mod merge;
pub mod plural_rules;
pub mod read_options;
pub mod registry;
pub mod services;
pub mod traits;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    clients::{
        DocumentClient, DocumentCodec, HtmlClient, HtmlCodec, PoClient, PoCodec, SrtCodec,
        SubtitleClient, TranslationClient, VttCodec, XclocClient, XclocCodec,
    },
    codec::{Codec, Detection, infer_format_from_extension, load_path, payload_from_path},
    error::{Envelope, Error},
    formats::FormatType,
    glossary::Term,
    merge::MergeStats,
    read_options::LoadOptions,
    registry::{DetectionMatch, FormatRegistry},
    services::{
        AgentBatch, AgentItem, MemoryProjectStore, ProjectStore, StoredProject, TranslateRequest,
        TranslationAgent,
    },
    types::{
        EntryMetadata, EntryPatch, EntryUpdate, ExportedFile, PluralCategory, TranslationEntry,
        TranslationProject, TranslationResource, UploadPayload, VirtualFile,
    },
};
