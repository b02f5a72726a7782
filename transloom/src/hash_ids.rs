//! Heuristics for PO files keyed by opaque hashes (`msgid "hzSNj4"`) instead
//! of source text.

use lazy_static::lazy_static;
use regex::Regex;

use crate::formats::po::{PoDocument, PoMsgstr};

lazy_static! {
    static ref HASH_CHARSET: Regex = Regex::new(r"^[A-Za-z0-9+/=_-]+$").unwrap();
}

/// Fewer non-empty values than this never count as hash keyed.
pub const MIN_SAMPLE: usize = 3;

/// Whether a msgid looks like an obfuscated key: 2–12 characters, no
/// whitespace, base64/url-safe alphabet only.
pub fn is_hash_like_msgid(s: &str) -> bool {
    let len = s.chars().count();
    (2..=12).contains(&len) && !s.chars().any(char::is_whitespace) && HASH_CHARSET.is_match(s)
}

/// True when at least [`MIN_SAMPLE`] values are non-empty and more than half of
/// them are hash-like.
pub fn mostly_hash_like<'a>(values: impl IntoIterator<Item = &'a str>) -> bool {
    let (total, hashed) = values
        .into_iter()
        .filter(|v| !v.is_empty())
        .fold((0usize, 0usize), |(total, hashed), v| {
            (total + 1, hashed + usize::from(is_hash_like_msgid(v)))
        });
    total >= MIN_SAMPLE && hashed * 2 > total
}

/// Whether the document as a whole uses hash keys as msgids.
pub fn has_hash_based_msgids(doc: &PoDocument) -> bool {
    mostly_hash_like(doc.entries.iter().map(|e| e.msgid.as_str()))
}

/// Whether the document's own translations look like hash keys. A reference
/// file must carry readable msgstr values, so this rejects it.
pub fn has_hash_based_msgstrs(doc: &PoDocument) -> bool {
    mostly_hash_like(doc.entries.iter().flat_map(|e| match &e.msgstr {
        PoMsgstr::Missing => Vec::new(),
        PoMsgstr::Singular(s) => vec![s.as_str()],
        PoMsgstr::Plural(forms) => forms.values().map(String::as_str).collect(),
    }))
}
