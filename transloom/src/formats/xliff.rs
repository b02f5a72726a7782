//! Support for XLIFF 1.2 as exported by Xcode.
//!
//! Parsing is an event walk over `<file>`, `<tool>`, `<trans-unit>` and the
//! `<source>`/`<target>`/`<note>` children of each unit. Units nested inside
//! `<group>` elements are flattened into their file. Serialization regenerates
//! the document from the parsed structure.

use std::io::{BufRead, Write};

use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    traits::{Parser, read_normalized},
};

pub const XLIFF_NAMESPACE: &str = "urn:oasis:names:tc:xliff:document:1.2";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XliffDocument {
    pub version: String,
    /// Attributes of the root element other than `version` (namespaces,
    /// schema locations), in document order.
    #[serde(default)]
    pub root_attributes: Vec<(String, String)>,
    pub files: Vec<XliffFile>,
}

impl XliffDocument {
    pub fn units(&self) -> impl Iterator<Item = &TransUnit> {
        self.files.iter().flat_map(|f| f.units.iter())
    }

    pub fn unit_count(&self) -> usize {
        self.files.iter().map(|f| f.units.len()).sum()
    }

    pub fn unit_mut(&mut self, file_index: usize, unit_index: usize) -> Option<&mut TransUnit> {
        self.files.get_mut(file_index)?.units.get_mut(unit_index)
    }
}

impl Parser for XliffDocument {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        parse_xliff(&read_normalized(reader)?)
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        writer.write_all(serialize_xliff(self)?.as_bytes())?;
        Ok(())
    }
}

/// One `<file>` element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XliffFile {
    pub original: String,
    pub source_language: String,
    #[serde(default)]
    pub target_language: String,
    #[serde(default)]
    pub datatype: Option<String>,
    /// Attributes of `<header><tool/></header>`, if present.
    #[serde(default)]
    pub tool: Option<Vec<(String, String)>>,
    #[serde(default)]
    pub units: Vec<TransUnit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransUnit {
    pub id: String,
    pub source: String,
    #[serde(default)]
    pub target: Option<String>,
    /// `state` attribute of `<target>`.
    #[serde(default)]
    pub target_state: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// `xml:space="preserve"` on the unit.
    #[serde(default)]
    pub preserve_space: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Source,
    Target,
    Note,
}

fn attributes(e: &BytesStart) -> Result<Vec<(String, String)>, Error> {
    let mut out = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::DataMismatch(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn attribute(attrs: &[(String, String)], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
}

fn open_file(e: &BytesStart) -> Result<XliffFile, Error> {
    let attrs = attributes(e)?;
    Ok(XliffFile {
        original: attribute(&attrs, "original").unwrap_or_default(),
        source_language: attribute(&attrs, "source-language").unwrap_or_default(),
        target_language: attribute(&attrs, "target-language").unwrap_or_default(),
        datatype: attribute(&attrs, "datatype"),
        tool: None,
        units: Vec::new(),
    })
}

fn open_unit(e: &BytesStart) -> Result<TransUnit, Error> {
    let attrs = attributes(e)?;
    Ok(TransUnit {
        id: attribute(&attrs, "id").unwrap_or_default(),
        preserve_space: attribute(&attrs, "xml:space").as_deref() == Some("preserve"),
        ..TransUnit::default()
    })
}

fn capture_kind(name: &[u8]) -> Option<Capture> {
    match name {
        b"source" => Some(Capture::Source),
        b"target" => Some(Capture::Target),
        b"note" => Some(Capture::Note),
        _ => None,
    }
}

fn store(unit: &mut TransUnit, capture: Capture, text: String) {
    match capture {
        Capture::Source => unit.source = text,
        Capture::Target => unit.target = Some(text),
        // Xcode writes one note per unit; later ones are appended.
        Capture::Note => match &mut unit.note {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(&text);
            }
            None => unit.note = Some(text),
        },
    }
}

/// Parses XLIFF 1.2 text.
pub fn parse_xliff(text: &str) -> Result<XliffDocument, Error> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut doc: Option<XliffDocument> = None;
    let mut file: Option<XliffFile> = None;
    let mut unit: Option<TransUnit> = None;
    let mut capture: Option<(Capture, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"xliff" => {
                    let mut attrs = attributes(&e)?;
                    let version = attribute(&attrs, "version").unwrap_or_else(|| "1.2".to_string());
                    attrs.retain(|(key, _)| key != "version");
                    doc = Some(XliffDocument {
                        version,
                        root_attributes: attrs,
                        files: Vec::new(),
                    });
                }
                b"file" => file = Some(open_file(&e)?),
                b"tool" => {
                    if let Some(file) = file.as_mut() {
                        file.tool = Some(attributes(&e)?);
                    }
                }
                b"trans-unit" => unit = Some(open_unit(&e)?),
                name => {
                    if let (Some(kind), Some(unit)) = (capture_kind(name), unit.as_mut()) {
                        if kind == Capture::Target {
                            unit.target_state = attribute(&attributes(&e)?, "state");
                        }
                        capture = Some((kind, String::new()));
                    } else if capture.is_some() {
                        tracing::debug!(
                            tag = %String::from_utf8_lossy(name),
                            "inline XLIFF markup flattened to text"
                        );
                    }
                }
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tool" => {
                    if let Some(file) = file.as_mut() {
                        file.tool = Some(attributes(&e)?);
                    }
                }
                b"file" => {
                    if let Some(doc) = doc.as_mut() {
                        doc.files.push(open_file(&e)?);
                    }
                }
                name => {
                    if let (Some(kind), Some(unit)) = (capture_kind(name), unit.as_mut()) {
                        if kind == Capture::Target {
                            unit.target_state = attribute(&attributes(&e)?, "state");
                        }
                        store(unit, kind, String::new());
                    }
                }
            },
            Event::Text(e) => {
                if let Some((_, buffer)) = capture.as_mut() {
                    buffer.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some((_, buffer)) = capture.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"trans-unit" => {
                    if let (Some(finished), Some(file)) = (unit.take(), file.as_mut()) {
                        file.units.push(finished);
                    }
                }
                b"file" => {
                    if let (Some(finished), Some(doc)) = (file.take(), doc.as_mut()) {
                        doc.files.push(finished);
                    }
                }
                name => {
                    if let Some(kind) = capture_kind(name)
                        && let Some((open, buffer)) = capture.take_if(|(open, _)| *open == kind)
                        && let Some(unit) = unit.as_mut()
                    {
                        store(unit, open, buffer);
                    }
                }
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let doc = doc.ok_or_else(|| Error::InvalidResource("missing <xliff> root element".to_string()))?;
    tracing::debug!(
        files = doc.files.len(),
        units = doc.unit_count(),
        "parsed XLIFF document"
    );
    Ok(doc)
}

/// Serializes the document as indented XLIFF 1.2.
pub fn serialize_xliff(doc: &XliffDocument) -> Result<String, Error> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("xliff");
    if doc.root_attributes.is_empty() {
        root.push_attribute(("xmlns", XLIFF_NAMESPACE));
    }
    for (key, value) in &doc.root_attributes {
        root.push_attribute((key.as_str(), value.as_str()));
    }
    root.push_attribute(("version", doc.version.as_str()));
    writer.write_event(Event::Start(root))?;

    for file in &doc.files {
        let mut start = BytesStart::new("file");
        start.push_attribute(("original", file.original.as_str()));
        start.push_attribute(("source-language", file.source_language.as_str()));
        if !file.target_language.is_empty() {
            start.push_attribute(("target-language", file.target_language.as_str()));
        }
        if let Some(datatype) = &file.datatype {
            start.push_attribute(("datatype", datatype.as_str()));
        }
        writer.write_event(Event::Start(start))?;

        if let Some(tool) = &file.tool {
            writer.write_event(Event::Start(BytesStart::new("header")))?;
            let mut element = BytesStart::new("tool");
            for (key, value) in tool {
                element.push_attribute((key.as_str(), value.as_str()));
            }
            writer.write_event(Event::Empty(element))?;
            writer.write_event(Event::End(BytesEnd::new("header")))?;
        }

        writer.write_event(Event::Start(BytesStart::new("body")))?;
        for unit in &file.units {
            write_unit(&mut writer, unit)?;
        }
        writer.write_event(Event::End(BytesEnd::new("body")))?;
        writer.write_event(Event::End(BytesEnd::new("file")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("xliff")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| Error::DataMismatch(e.to_string()))
}

fn write_unit(writer: &mut Writer<Vec<u8>>, unit: &TransUnit) -> Result<(), Error> {
    let mut start = BytesStart::new("trans-unit");
    start.push_attribute(("id", unit.id.as_str()));
    if unit.preserve_space {
        start.push_attribute(("xml:space", "preserve"));
    }
    writer.write_event(Event::Start(start))?;

    writer
        .create_element("source")
        .write_text_content(BytesText::new(&unit.source))?;

    if let Some(target) = &unit.target {
        let mut element = writer.create_element("target");
        if let Some(state) = &unit.target_state {
            element = element.with_attribute(("state", state.as_str()));
        }
        element.write_text_content(BytesText::new(target))?;
    }

    if let Some(note) = &unit.note {
        writer
            .create_element("note")
            .write_text_content(BytesText::new(note))?;
    }

    writer.write_event(Event::End(BytesEnd::new("trans-unit")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <xliff xmlns="urn:oasis:names:tc:xliff:document:1.2" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" version="1.2">
          <file original="App/en.lproj/Localizable.strings" source-language="en" target-language="fr" datatype="plaintext">
            <header>
              <tool tool-id="com.apple.dt.xcode" tool-name="Xcode" tool-version="15.0" build-num="15A240d"/>
            </header>
            <body>
              <trans-unit id="greeting" xml:space="preserve">
                <source>Hello &amp; welcome</source>
                <target state="translated">Bonjour &amp; bienvenue</target>
                <note>Shown on launch</note>
              </trans-unit>
              <trans-unit id="empty">
                <source>Settings</source>
                <target/>
              </trans-unit>
              <trans-unit id="untranslated" xml:space="preserve">
                <source>Tap &lt;here&gt; to  continue</source>
                <note/>
              </trans-unit>
            </body>
          </file>
        </xliff>
    "#};

    #[test]
    fn test_parse_files_and_units() {
        let doc = parse_xliff(SAMPLE).unwrap();
        assert_eq!(doc.version, "1.2");
        assert_eq!(doc.files.len(), 1);
        let file = &doc.files[0];
        assert_eq!(file.original, "App/en.lproj/Localizable.strings");
        assert_eq!(file.source_language, "en");
        assert_eq!(file.target_language, "fr");
        assert_eq!(file.datatype.as_deref(), Some("plaintext"));
        assert!(file.tool.as_ref().unwrap().contains(&("tool-id".to_string(), "com.apple.dt.xcode".to_string())));
        assert_eq!(file.units.len(), 3);
    }

    #[test]
    fn test_entities_and_whitespace() {
        let doc = parse_xliff(SAMPLE).unwrap();
        let units = &doc.files[0].units;
        assert_eq!(units[0].source, "Hello & welcome");
        assert_eq!(units[0].target.as_deref(), Some("Bonjour & bienvenue"));
        assert_eq!(units[0].target_state.as_deref(), Some("translated"));
        assert_eq!(units[0].note.as_deref(), Some("Shown on launch"));
        assert!(units[0].preserve_space);
        assert_eq!(units[2].source, "Tap <here> to  continue");
    }

    #[test]
    fn test_empty_and_missing_tags() {
        let doc = parse_xliff(SAMPLE).unwrap();
        let units = &doc.files[0].units;
        assert_eq!(units[1].target.as_deref(), Some(""));
        assert!(!units[1].preserve_space);
        assert_eq!(units[2].target, None);
        assert_eq!(units[2].note.as_deref(), Some(""));
    }

    #[test]
    fn test_round_trip_structure() {
        let doc = parse_xliff(SAMPLE).unwrap();
        let text = serialize_xliff(&doc).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("<source>Hello &amp; welcome</source>"));
        assert!(text.contains("xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\""));
        assert_eq!(parse_xliff(&text).unwrap(), doc);
    }

    #[test]
    fn test_translation_written_back() {
        let mut doc = parse_xliff(SAMPLE).unwrap();
        let unit = doc.unit_mut(0, 2).unwrap();
        unit.target = Some("Touchez <ici> \"maintenant\"".to_string());
        let reparsed = parse_xliff(&serialize_xliff(&doc).unwrap()).unwrap();
        assert_eq!(
            reparsed.files[0].units[2].target.as_deref(),
            Some("Touchez <ici> \"maintenant\"")
        );
    }

    #[test]
    fn test_grouped_units_and_cdata() {
        let xml = r#"<xliff version="1.2"><file original="a" source-language="en"><body><group id="g"><trans-unit id="1"><source><![CDATA[a < b]]></source></trans-unit></group></body></file></xliff>"#;
        let doc = parse_xliff(xml).unwrap();
        assert_eq!(doc.files[0].units[0].source, "a < b");
    }

    #[test]
    fn test_missing_root_is_error() {
        assert!(parse_xliff("<resources/>").is_err());
    }
}
