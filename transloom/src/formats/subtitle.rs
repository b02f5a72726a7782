//! Shared pieces of the SubRip and WebVTT codecs: the cue type, timing line
//! parsing, and timestamp conversion.
//!
//! Timestamps are always written back as the strings they were read from.
//! The millisecond values exist for display and validation only.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One subtitle cue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    /// 1-based position among the cues of the document.
    pub index: usize,
    /// SRT counter line or WebVTT cue identifier, verbatim.
    #[serde(default)]
    pub id: Option<String>,
    pub start_ms: u64,
    pub end_ms: u64,
    pub start_timestamp: String,
    pub end_timestamp: String,
    /// WebVTT cue settings after the end timestamp.
    #[serde(default)]
    pub settings: Option<String>,
    pub text: String,
}

impl Cue {
    pub fn timing_line(&self) -> String {
        match &self.settings {
            Some(settings) => format!(
                "{} --> {} {}",
                self.start_timestamp, self.end_timestamp, settings
            ),
            None => format!("{} --> {}", self.start_timestamp, self.end_timestamp),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

pub(crate) struct Timing {
    pub start: String,
    pub end: String,
    pub settings: Option<String>,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Parses `start --> end [settings]`.
pub(crate) fn parse_timing(line: &str) -> Result<Timing, Error> {
    let (left, right) = line
        .split_once("-->")
        .ok_or_else(|| Error::DataMismatch(format!("not a timing line: `{}`", line)))?;
    let start = left.trim().to_string();
    let right = right.trim();
    let (end, settings) = match right.split_once(char::is_whitespace) {
        Some((end, rest)) => (end.to_string(), Some(rest.trim().to_string())),
        None => (right.to_string(), None),
    };
    let start_ms = timestamp_to_ms(&start)?;
    let end_ms = timestamp_to_ms(&end)?;
    if end_ms < start_ms {
        tracing::warn!(%start, %end, "cue ends before it starts");
    }
    Ok(Timing {
        start,
        end,
        settings: settings.filter(|s| !s.is_empty()),
        start_ms,
        end_ms,
    })
}

/// Builds a cue from a block whose timing line is `lines[timing_at]`.
pub(crate) fn cue_from_block(
    lines: &[&str],
    timing_at: usize,
    index: usize,
) -> Result<Cue, Error> {
    let timing = parse_timing(lines[timing_at])?;
    let id = (timing_at > 0).then(|| lines[timing_at - 1].trim().to_string());
    Ok(Cue {
        index,
        id,
        start_ms: timing.start_ms,
        end_ms: timing.end_ms,
        start_timestamp: timing.start,
        end_timestamp: timing.end,
        settings: timing.settings,
        text: lines[timing_at + 1..].join("\n"),
    })
}

/// Whether the source text breaks lines with CRLF.
pub(crate) fn uses_crlf(text: &str) -> bool {
    text.contains("\r\n")
}

/// Rewrites LF-joined output with CRLF line breaks when `crlf` is set.
pub(crate) fn with_line_endings(out: String, crlf: bool) -> String {
    if crlf {
        out.replace("\r\n", "\n").replace('\n', "\r\n")
    } else {
        out
    }
}

/// Groups lines into blocks separated by blank lines.
pub(crate) fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Converts `[hh:]mm:ss[,.]fff` to milliseconds. The fraction may have any
/// number of digits; only the first three count.
pub fn timestamp_to_ms(timestamp: &str) -> Result<u64, Error> {
    let invalid = || Error::DataMismatch(format!("invalid timestamp `{}`", timestamp));
    let parts: Vec<&str> = timestamp.trim().split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => ("0", *m, *s),
        _ => return Err(invalid()),
    };
    let (whole, fraction) = match seconds.split_once([',', '.']) {
        Some((whole, fraction)) => (whole, fraction),
        None => (seconds, ""),
    };

    let number = |s: &str| -> Result<u64, Error> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse::<u64>().map_err(|_| invalid())
    };

    let millis = if fraction.is_empty() {
        0
    } else {
        let digits: String = fraction.chars().take(3).collect();
        number(&digits)? * 10u64.pow(3 - digits.len() as u32)
    };
    let minutes = number(minutes)?;
    let seconds = number(whole)?;
    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }
    number(hours)?
        .checked_mul(60)
        .and_then(|m| m.checked_add(minutes))
        .and_then(|m| m.checked_mul(60))
        .and_then(|s| s.checked_add(seconds))
        .and_then(|s| s.checked_mul(1000))
        .and_then(|ms| ms.checked_add(millis))
        .ok_or_else(|| Error::DataMismatch(format!("timestamp `{}` out of range", timestamp)))
}

/// Formats milliseconds as `HH:MM:SS{sep}mmm` (`,` for SRT, `.` for WebVTT).
pub fn ms_to_timestamp(ms: u64, separator: char) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1000) % 60;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours,
        minutes,
        seconds,
        separator,
        ms % 1000
    )
}
