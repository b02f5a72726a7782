//! SubRip and WebVTT subtitles: one entry per cue, id = 1-based cue index.
//!
//! Cue timing never passes through the entry model; export swaps in the
//! translated text and writes the original timestamp strings.

use serde::{Deserialize, Serialize};

use crate::{
    clients::{
        TranslationClient, apply_updates, from_format_data, single_file_text, single_resource,
    },
    codec::{Codec, Detection},
    error::Error,
    formats::{
        srt::{SrtDocument, parse_srt, serialize_srt},
        subtitle::Cue,
        vtt::{VTT_SIGNATURE, VttDocument, parse_vtt, serialize_vtt},
    },
    glossary::{Term, glossary_file},
    types::{
        CueMetadata, EntryMetadata, EntryUpdate, ExportedFile, TranslationEntry,
        TranslationProject, TranslationResource, UploadPayload,
    },
};

pub const SRT_FORMAT_ID: &str = "srt";
pub const VTT_FORMAT_ID: &str = "vtt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleKind {
    Srt,
    Vtt,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", content = "document", rename_all = "snake_case")]
enum SubtitleDocument {
    Srt(SrtDocument),
    Vtt(VttDocument),
}

impl SubtitleDocument {
    fn cues(&self) -> Box<dyn Iterator<Item = &Cue> + '_> {
        match self {
            SubtitleDocument::Srt(doc) => Box::new(doc.cues.iter()),
            SubtitleDocument::Vtt(doc) => Box::new(doc.cues()),
        }
    }

    fn cues_mut(&mut self) -> Box<dyn Iterator<Item = &mut Cue> + '_> {
        match self {
            SubtitleDocument::Srt(doc) => Box::new(doc.cues.iter_mut()),
            SubtitleDocument::Vtt(doc) => Box::new(doc.cues_mut()),
        }
    }

    fn serialize(&self) -> String {
        match self {
            SubtitleDocument::Srt(doc) => serialize_srt(doc),
            SubtitleDocument::Vtt(doc) => serialize_vtt(doc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubtitleState {
    file_name: String,
    document: SubtitleDocument,
}

/// Client for one subtitle flavor.
#[derive(Debug)]
pub struct SubtitleClient {
    kind: SubtitleKind,
    state: Option<(SubtitleState, TranslationProject)>,
}

impl SubtitleClient {
    pub fn new(kind: SubtitleKind) -> Self {
        SubtitleClient { kind, state: None }
    }

    pub fn srt() -> Self {
        Self::new(SubtitleKind::Srt)
    }

    pub fn vtt() -> Self {
        Self::new(SubtitleKind::Vtt)
    }

    fn loaded(&self) -> Result<&(SubtitleState, TranslationProject), Error> {
        self.state.as_ref().ok_or(Error::NotLoaded)
    }

    /// The document with translated cue text in place.
    fn translated_document(&self) -> Result<SubtitleDocument, Error> {
        let (state, project) = self.loaded()?;
        let resource = single_resource(project)?;
        let mut document = state.document.clone();
        for cue in document.cues_mut() {
            if let Some(entry) = resource.find_entry(&cue.index.to_string())
                && entry.is_translated()
            {
                cue.text = entry.target_text.clone();
            }
        }
        Ok(document)
    }
}

fn build_project(file_name: &str, document: &SubtitleDocument) -> TranslationProject {
    let mut resource = TranslationResource::new(file_name, file_name);
    for cue in document.cues() {
        let mut entry = TranslationEntry::new(cue.index.to_string(), cue.text.clone());
        entry.metadata = EntryMetadata::Subtitle(CueMetadata {
            cue_index: cue.index,
            cue_id: cue.id.clone(),
            start_timestamp: cue.start_timestamp.clone(),
            end_timestamp: cue.end_timestamp.clone(),
            start_ms: cue.start_ms,
            end_ms: cue.end_ms,
        });
        resource.add_entry(entry);
    }
    let mut project = TranslationProject::new(file_name);
    project.resources.push(resource);
    project
}

impl TranslationClient for SubtitleClient {
    fn format_id(&self) -> &'static str {
        match self.kind {
            SubtitleKind::Srt => SRT_FORMAT_ID,
            SubtitleKind::Vtt => VTT_FORMAT_ID,
        }
    }

    fn load(&mut self, payload: &UploadPayload) -> Result<(), Error> {
        let text = single_file_text(payload, "subtitles")?;
        let document = match self.kind {
            SubtitleKind::Srt => SubtitleDocument::Srt(parse_srt(&text)),
            SubtitleKind::Vtt => SubtitleDocument::Vtt(parse_vtt(&text)),
        };
        if document.cues().next().is_none() {
            return Err(Error::NoTranslatableContent("no subtitle cues found".to_string()));
        }
        let file_name = payload.file_name().to_string();
        let project = build_project(&file_name, &document);
        self.state = Some((SubtitleState { file_name, document }, project));
        Ok(())
    }

    fn project(&self) -> Result<&TranslationProject, Error> {
        Ok(&self.loaded()?.1)
    }

    fn project_mut(&mut self) -> Result<&mut TranslationProject, Error> {
        Ok(&mut self.state.as_mut().ok_or(Error::NotLoaded)?.1)
    }

    fn update_entries(&mut self, updates: &[EntryUpdate]) -> Result<(), Error> {
        let (_, project) = self.state.as_mut().ok_or(Error::NotLoaded)?;
        apply_updates(project, updates)
    }

    fn export_file(&self, terms: Option<&[Term]>) -> Result<ExportedFile, Error> {
        let (state, _) = self.loaded()?;
        Ok(ExportedFile {
            file_name: state.file_name.clone(),
            bytes: self.translated_document()?.serialize().into_bytes(),
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
        let state: SubtitleState = from_format_data(format_data)?;
        let kind = match state.document {
            SubtitleDocument::Srt(_) => SubtitleKind::Srt,
            SubtitleDocument::Vtt(_) => SubtitleKind::Vtt,
        };
        if kind != self.kind {
            return Err(Error::DataMismatch(format!(
                "stored subtitles are {:?}, this client reads {:?}",
                kind, self.kind
            )));
        }
        self.state = Some((state, project));
        Ok(())
    }
}

fn first_timing_line(text: &str) -> Option<&str> {
    text.lines().find(|l| l.contains("-->"))
}

/// Detects SubRip files.
#[derive(Debug, Default)]
pub struct SrtCodec;

impl Codec for SrtCodec {
    fn format_id(&self) -> &'static str {
        SRT_FORMAT_ID
    }

    fn detect(&self, payload: &UploadPayload) -> Detection {
        let Some(file) = payload.as_single_file() else {
            return Detection::none();
        };
        let by_extension = file.extension().as_deref() == Some("srt");
        let text = file.text().unwrap_or_default();
        let text = text.trim_start_matches('\u{feff}');
        // SubRip uses a comma before milliseconds and has no WEBVTT header.
        let srt_timing = !text.starts_with(VTT_SIGNATURE)
            && first_timing_line(text).is_some_and(|l| l.contains(','));
        match (by_extension, srt_timing) {
            (true, true) => Detection::new(1.0, "SRT extension and timing lines"),
            (false, true) => Detection::new(0.7, "SRT timing lines"),
            (true, false) => Detection::new(0.6, "SRT extension only"),
            (false, false) => Detection::none(),
        }
    }

    fn new_client(&self) -> Box<dyn TranslationClient> {
        Box::new(SubtitleClient::srt())
    }
}

/// Detects WebVTT files.
#[derive(Debug, Default)]
pub struct VttCodec;

impl Codec for VttCodec {
    fn format_id(&self) -> &'static str {
        VTT_FORMAT_ID
    }

    fn detect(&self, payload: &UploadPayload) -> Detection {
        let Some(file) = payload.as_single_file() else {
            return Detection::none();
        };
        let by_extension = file.extension().as_deref() == Some("vtt");
        let text = file.text().unwrap_or_default();
        let has_signature = text.trim_start_matches('\u{feff}').starts_with(VTT_SIGNATURE);
        match (by_extension, has_signature) {
            (true, true) => Detection::new(1.0, "VTT extension and WEBVTT header"),
            (false, true) => Detection::new(0.9, "WEBVTT header"),
            (true, false) => Detection::new(0.6, "VTT extension only"),
            (false, false) => Detection::none(),
        }
    }

    fn new_client(&self) -> Box<dyn TranslationClient> {
        Box::new(SubtitleClient::vtt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryPatch;

    const SRT: &str = "1\n00:00:01,000 --> 00:00:02,50\nHello.\n\n2\n00:00:03,000 --> 00:00:04,000\nBye.\n";
    const VTT: &str = "WEBVTT\n\nNOTE keep\n\nintro\n00:01.000 --> 00:02.000 align:start\nHello.\n";

    #[test]
    fn test_srt_projection_and_export() {
        let mut client = SubtitleClient::srt();
        client
            .load(&UploadPayload::single_file("movie.srt", SRT.as_bytes().to_vec()))
            .unwrap();
        let resource = client.resource("movie.srt").unwrap();
        assert_eq!(resource.entries.len(), 2);
        assert_eq!(resource.entries[0].id, "1");
        let EntryMetadata::Subtitle(meta) = &resource.entries[0].metadata else {
            panic!("expected cue metadata");
        };
        assert_eq!(meta.end_timestamp, "00:00:02,50");
        assert_eq!(meta.end_ms, 2500);

        client
            .update_entry("movie.srt", "1", &EntryPatch::target("Bonjour."))
            .unwrap();
        let out = String::from_utf8(client.export_file(None).unwrap().bytes).unwrap();
        assert_eq!(
            out,
            "1\n00:00:01,000 --> 00:00:02,50\nBonjour.\n\n2\n00:00:03,000 --> 00:00:04,000\nBye.\n"
        );
    }

    #[test]
    fn test_vtt_keeps_notes_and_settings() {
        let mut client = SubtitleClient::vtt();
        client
            .load(&UploadPayload::single_file("movie.vtt", VTT.as_bytes().to_vec()))
            .unwrap();
        assert_eq!(client.format_id(), "vtt");
        client
            .update_entry("movie.vtt", "1", &EntryPatch::target("Salut."))
            .unwrap();
        let out = String::from_utf8(client.export_file(None).unwrap().bytes).unwrap();
        assert_eq!(
            out,
            "WEBVTT\n\nNOTE keep\n\nintro\n00:01.000 --> 00:02.000 align:start\nSalut.\n"
        );
    }

    #[test]
    fn test_crlf_export_is_byte_identical() {
        let text = SRT.replace('\n', "\r\n");
        let mut client = SubtitleClient::srt();
        client
            .load(&UploadPayload::single_file("movie.srt", text.as_bytes().to_vec()))
            .unwrap();
        assert_eq!(client.resource("movie.srt").unwrap().entries[1].source_text, "Bye.");
        assert_eq!(client.export_file(None).unwrap().bytes, text.as_bytes().to_vec());

        client
            .update_entry("movie.srt", "2", &EntryPatch::target("Salut."))
            .unwrap();
        let out = String::from_utf8(client.export_file(None).unwrap().bytes).unwrap();
        assert!(out.ends_with("00:00:03,000 --> 00:00:04,000\r\nSalut.\r\n"));
    }

    #[test]
    fn test_no_cues_is_an_error() {
        let mut client = SubtitleClient::srt();
        assert!(matches!(
            client.load(&UploadPayload::single_file("empty.srt", b"\n\n".to_vec())),
            Err(Error::NoTranslatableContent(_))
        ));
    }

    #[test]
    fn test_detection() {
        let srt = UploadPayload::single_file("movie.srt", SRT.as_bytes().to_vec());
        let vtt = UploadPayload::single_file("movie.vtt", VTT.as_bytes().to_vec());
        assert_eq!(SrtCodec.detect(&srt).score, 1.0);
        assert_eq!(SrtCodec.detect(&vtt).score, 0.0);
        assert_eq!(VttCodec.detect(&vtt).score, 1.0);
        assert_eq!(VttCodec.detect(&srt).score, 0.0);
    }

    #[test]
    fn test_format_data_rejects_other_flavor() {
        let mut srt = SubtitleClient::srt();
        srt.load(&UploadPayload::single_file("movie.srt", SRT.as_bytes().to_vec()))
            .unwrap();
        let data = srt.format_data().unwrap();
        let project = srt.project().unwrap().clone();
        assert!(SubtitleClient::vtt().load_from_json(project.clone(), data.clone()).is_err());
        assert!(SubtitleClient::srt().load_from_json(project, data).is_ok());
    }
}
