//! Escaping and quoting helpers for gettext PO strings.

/// Unescapes the content of a PO quoted string (without the quotes).
///
/// Recognizes `\n`, `\t`, `\r`, `\"` and `\\`. Unknown escapes are kept
/// verbatim, backslash included.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Escapes a string for use inside PO quotes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Extracts and unescapes the quoted string of a keyword or continuation line.
///
/// `"Hello \"world\""` → `Hello "world"`. Returns `None` when the line has no
/// opening quote. A missing closing quote takes the rest of the line.
pub fn extract_quoted(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let rest = &line[start + 1..];
    let end = closing_quote(rest).unwrap_or(rest.len());
    Some(unescape(&rest[..end]))
}

// Byte offset of the first unescaped quote.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

/// Renders `keyword "value"`, switching to continuation style when the value
/// contains a newline:
///
/// ```text
/// msgid ""
/// "first line\n"
/// "second line"
/// ```
pub fn format_keyword(keyword: &str, value: &str) -> String {
    if !value.contains('\n') || value == "\n" {
        return format!("{} \"{}\"\n", keyword, escape(value));
    }

    let mut out = format!("{} \"\"\n", keyword);
    for fragment in value.split_inclusive('\n') {
        out.push('"');
        out.push_str(&escape(fragment));
        out.push_str("\"\n");
    }
    out
}
