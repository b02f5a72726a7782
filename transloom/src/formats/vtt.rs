//! Support for WebVTT (`.vtt`) subtitles.
//!
//! `NOTE`, `STYLE` and `REGION` blocks are not cues; they are kept verbatim in
//! their original position.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    formats::subtitle::{Cue, cue_from_block, split_blocks, uses_crlf, with_line_endings},
    traits::{Parser, read_text},
};

pub const VTT_SIGNATURE: &str = "WEBVTT";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum VttBlock {
    Cue(Cue),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct VttDocument {
    /// The `WEBVTT ...` header block, verbatim.
    #[serde(default)]
    pub header: Option<String>,
    pub blocks: Vec<VttBlock>,
    /// The source broke lines with CRLF; output does the same.
    #[serde(default)]
    pub crlf: bool,
}

impl VttDocument {
    pub fn cues(&self) -> impl Iterator<Item = &Cue> {
        self.blocks.iter().filter_map(|b| match b {
            VttBlock::Cue(cue) => Some(cue),
            VttBlock::Raw(_) => None,
        })
    }

    pub fn cues_mut(&mut self) -> impl Iterator<Item = &mut Cue> {
        self.blocks.iter_mut().filter_map(|b| match b {
            VttBlock::Cue(cue) => Some(cue),
            VttBlock::Raw(_) => None,
        })
    }
}

impl Parser for VttDocument {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        Ok(parse_vtt(&read_text(reader)?))
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        writer.write_all(serialize_vtt(self).as_bytes())?;
        Ok(())
    }
}

fn is_raw_block(first_line: &str) -> bool {
    ["NOTE", "STYLE", "REGION"].iter().any(|keyword| {
        first_line
            .strip_prefix(keyword)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    })
}

pub fn parse_vtt(text: &str) -> VttDocument {
    let mut doc = VttDocument {
        crlf: uses_crlf(text),
        ..VttDocument::default()
    };
    let mut cue_count = 0;

    for (i, block) in split_blocks(text).into_iter().enumerate() {
        let first = block[0].trim_start_matches('\u{feff}');
        if i == 0 && first.starts_with(VTT_SIGNATURE) {
            doc.header = Some(block.join("\n"));
            continue;
        }
        if is_raw_block(first) {
            doc.blocks.push(VttBlock::Raw(block.join("\n")));
            continue;
        }
        let timing_at = match block.iter().position(|l| l.contains("-->")) {
            Some(i @ (0 | 1)) => i,
            _ => {
                tracing::warn!(first_line = first, "WebVTT block without timing line skipped");
                continue;
            }
        };
        match cue_from_block(&block, timing_at, cue_count + 1) {
            Ok(cue) => {
                cue_count += 1;
                doc.blocks.push(VttBlock::Cue(cue));
            }
            Err(e) => tracing::warn!(error = %e, "malformed WebVTT cue skipped"),
        }
    }

    if doc.header.is_none() {
        tracing::debug!("WebVTT text without WEBVTT header");
    }
    tracing::debug!(cues = cue_count, "parsed WebVTT document");
    doc
}

pub fn serialize_vtt(doc: &VttDocument) -> String {
    let mut blocks = Vec::with_capacity(doc.blocks.len() + 1);
    blocks.push(doc.header.clone().unwrap_or_else(|| VTT_SIGNATURE.to_string()));
    for block in &doc.blocks {
        match block {
            VttBlock::Raw(raw) => blocks.push(raw.clone()),
            VttBlock::Cue(cue) => {
                let mut out = String::new();
                if let Some(id) = &cue.id {
                    out.push_str(id);
                    out.push('\n');
                }
                out.push_str(&cue.timing_line());
                if !cue.text.is_empty() {
                    out.push('\n');
                    out.push_str(&cue.text);
                }
                blocks.push(out);
            }
        }
    }
    let mut out = blocks.join("\n\n");
    out.push('\n');
    with_line_endings(out, doc.crlf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {"
        WEBVTT - Demo track
        Kind: captions

        NOTE This file was
        hand written

        STYLE
        ::cue { color: yellow }

        intro
        00:01.000 --> 00:02.000 align:start position:10%
        Welcome!

        00:00:02.5 --> 00:00:04.000
        <v Roger>Second cue
        continues here
    "};

    #[test]
    fn test_parse_blocks() {
        let doc = parse_vtt(SAMPLE);
        assert_eq!(doc.header.as_deref(), Some("WEBVTT - Demo track\nKind: captions"));
        assert_eq!(doc.blocks.len(), 4);
        let cues: Vec<_> = doc.cues().collect();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].id.as_deref(), Some("intro"));
        assert_eq!(cues[0].settings.as_deref(), Some("align:start position:10%"));
        assert_eq!(cues[0].start_ms, 1000);
        assert_eq!(cues[1].id, None);
        assert_eq!(cues[1].index, 2);
        assert_eq!(cues[1].start_ms, 2500);
        assert_eq!(cues[1].text, "<v Roger>Second cue\ncontinues here");
    }

    #[test]
    fn test_round_trip_is_lossless() {
        assert_eq!(serialize_vtt(&parse_vtt(SAMPLE)), SAMPLE);
    }

    #[test]
    fn test_crlf_round_trip_is_lossless() {
        let text = SAMPLE.replace('\n', "\r\n");
        let doc = VttDocument::from_str(&text).unwrap();
        assert!(doc.crlf);
        assert_eq!(doc.header.as_deref(), Some("WEBVTT - Demo track\nKind: captions"));
        assert_eq!(serialize_vtt(&doc), text);
    }

    #[test]
    fn test_timestamps_kept_after_edit() {
        let mut doc = parse_vtt(SAMPLE);
        for cue in doc.cues_mut() {
            cue.text = cue.text.to_uppercase();
        }
        let out = serialize_vtt(&doc);
        assert!(out.contains("00:00:02.5 --> 00:00:04.000\n<V ROGER>SECOND CUE"));
        assert!(out.contains("NOTE This file was\nhand written"));
    }

    #[test]
    fn test_missing_header_gets_default() {
        let doc = parse_vtt("00:01.000 --> 00:02.000\nHi\n");
        assert_eq!(doc.header, None);
        assert_eq!(serialize_vtt(&doc), "WEBVTT\n\n00:01.000 --> 00:02.000\nHi\n");
    }

    #[test]
    fn test_note_keyword_must_be_whole_word() {
        assert!(is_raw_block("NOTE"));
        assert!(is_raw_block("NOTE something"));
        assert!(!is_raw_block("NOTEBOOK"));
    }
}
