//! Support for SubRip (`.srt`) subtitles.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    formats::subtitle::{Cue, cue_from_block, split_blocks, uses_crlf, with_line_endings},
    traits::{Parser, read_text},
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct SrtDocument {
    pub cues: Vec<Cue>,
    /// The source broke lines with CRLF; output does the same.
    #[serde(default)]
    pub crlf: bool,
}

impl Parser for SrtDocument {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        Ok(parse_srt(&read_text(reader)?))
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        writer.write_all(serialize_srt(self).as_bytes())?;
        Ok(())
    }
}

/// Parses SRT text. Blocks without a valid timing line are skipped with a
/// warning.
pub fn parse_srt(text: &str) -> SrtDocument {
    let mut cues = Vec::new();
    for block in split_blocks(text) {
        // Counter line is normally present; tolerate blocks that start with
        // the timing line.
        let timing_at = match block.iter().position(|l| l.contains("-->")) {
            Some(i @ (0 | 1)) => i,
            _ => {
                tracing::warn!(first_line = block[0], "SRT block without timing line skipped");
                continue;
            }
        };
        match cue_from_block(&block, timing_at, cues.len() + 1) {
            Ok(cue) => cues.push(cue),
            Err(e) => tracing::warn!(error = %e, "malformed SRT block skipped"),
        }
    }
    tracing::debug!(cues = cues.len(), "parsed SRT document");
    SrtDocument {
        cues,
        crlf: uses_crlf(text),
    }
}

pub fn serialize_srt(doc: &SrtDocument) -> String {
    let mut out = String::new();
    for (i, cue) in doc.cues.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match &cue.id {
            Some(id) => out.push_str(id),
            None => out.push_str(&cue.index.to_string()),
        }
        out.push('\n');
        out.push_str(&cue.timing_line());
        out.push('\n');
        if !cue.text.is_empty() {
            out.push_str(&cue.text);
            out.push('\n');
        }
    }
    with_line_endings(out, doc.crlf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {"
        1
        00:00:01,000 --> 00:00:02,500
        Hello there.

        2
        00:00:03,1 --> 00:00:04,25
        Two lines
        of text.
    "};

    #[test]
    fn test_parse_cues() {
        let doc = parse_srt(SAMPLE);
        assert_eq!(doc.cues.len(), 2);
        assert_eq!(doc.cues[0].id.as_deref(), Some("1"));
        assert_eq!(doc.cues[0].start_ms, 1000);
        assert_eq!(doc.cues[0].end_ms, 2500);
        assert_eq!(doc.cues[1].text, "Two lines\nof text.");
        assert_eq!(doc.cues[1].start_ms, 3100);
        assert_eq!(doc.cues[1].end_ms, 4250);
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let doc = parse_srt(SAMPLE);
        assert_eq!(serialize_srt(&doc), SAMPLE);
    }

    #[test]
    fn test_non_canonical_timestamps_survive_edits() {
        let mut doc = parse_srt(SAMPLE);
        doc.cues[1].text = "Deux lignes".to_string();
        let out = serialize_srt(&doc);
        assert!(out.contains("00:00:03,1 --> 00:00:04,25\nDeux lignes\n"));
    }

    #[test]
    fn test_crlf_and_malformed_blocks() {
        let text = "1\r\n00:00:01,000 --> 00:00:02,000\r\nHi\r\n\r\ngarbage block\r\n\r\n3\r\n99:xx --> 00:00:05,000\r\nBad\r\n\r\n4\r\n00:00:06,000 --> 00:00:07,000\r\nBye\r\n";
        let doc = SrtDocument::from_str(text).unwrap();
        assert_eq!(doc.cues.len(), 2);
        assert_eq!(doc.cues[1].text, "Bye");
        assert_eq!(doc.cues[1].index, 2);
    }

    #[test]
    fn test_crlf_round_trip_is_lossless() {
        let text = SAMPLE.replace('\n', "\r\n");
        let mut doc = SrtDocument::from_str(&text).unwrap();
        assert!(doc.crlf);
        assert_eq!(doc.cues[1].text, "Two lines\nof text.");
        assert_eq!(serialize_srt(&doc), text);

        doc.cues[0].text = "Salut\nà tous".to_string();
        assert!(serialize_srt(&doc).starts_with("1\r\n00:00:01,000 --> 00:00:02,500\r\nSalut\r\nà tous\r\n\r\n2\r\n"));
    }

    #[test]
    fn test_overflowing_timestamp_block_is_skipped() {
        let text = "1\n999999999999999999:00:00,000 --> 999999999999999999:00:01,000\nx\n\n2\n00:00:01,000 --> 00:00:02,000\ny\n";
        let doc = parse_srt(text);
        assert_eq!(doc.cues.len(), 1);
        assert_eq!(doc.cues[0].text, "y");
    }
}
