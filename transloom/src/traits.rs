//! Traits for reading and writing native localization documents.

use std::{
    fs::File,
    io::{BufRead, BufWriter, Cursor, Read, Write},
    path::Path,
};

use crate::error::Error;

/// A trait for parsing and writing one native document from/to text.
///
/// # Example
///
/// ```rust,no_run
/// use transloom::traits::Parser;
/// let document = transloom::formats::po::PoDocument::read_from("fr.po")?;
/// document.write_to("fr_copy.po")?;
/// Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Parser {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Parse from file path.
    ///
    /// A byte order mark selects UTF-16 decoding; anything else is read as UTF-8.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let file = File::open(path).map_err(Error::Io)?;
        let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
            .bom_override(true)
            .build(file);

        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).map_err(Error::Io)?;

        Self::from_str(&decoded)
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error>;

    /// Write to file path.
    fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        self.to_writer(writer)
    }

    /// Parse from a string.
    fn from_str(s: &str) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(s))
    }

    /// Parse from bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Serialize into an owned string.
    fn to_text(&self) -> Result<String, Error> {
        let mut out = Vec::new();
        self.to_writer(&mut out)?;
        String::from_utf8(out).map_err(|e| Error::DataMismatch(e.to_string()))
    }
}

/// Reads the whole reader into a string without a leading byte order mark.
pub(crate) fn read_text<R: BufRead>(mut reader: R) -> Result<String, Error> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    if let Some(stripped) = content.strip_prefix('\u{feff}') {
        content = stripped.to_string();
    }
    Ok(content)
}

/// Like [`read_text`], normalizing CRLF line endings.
pub(crate) fn read_normalized<R: BufRead>(reader: R) -> Result<String, Error> {
    let mut content = read_text(reader)?;
    if content.contains('\r') {
        content = content.replace("\r\n", "\n");
    }
    Ok(content)
}
