//! The `Codec` trait: how a format recognizes an upload and creates the
//! client that loads it. Also turns files on disk into upload payloads.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    archive::{is_zip, read_zip},
    clients::TranslationClient,
    error::Error,
    formats::FormatType,
    read_options::LoadOptions,
    registry::FormatRegistry,
    types::{UploadPayload, VirtualFile, extension_of},
};

/// How confident a codec is that it can load a payload.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Detection {
    /// `0.0` (no) to `1.0` (certain).
    pub score: f32,
    pub reason: String,
}

impl Detection {
    pub fn new(score: f32, reason: impl Into<String>) -> Self {
        Detection {
            score: score.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }

    pub fn none() -> Self {
        Detection::new(0.0, "not recognized")
    }
}

/// A format's detection logic and client factory.
pub trait Codec: Send + Sync {
    fn format_id(&self) -> &'static str;

    fn detect(&self, payload: &UploadPayload) -> Detection;

    /// A fresh client, not loaded yet.
    fn new_client(&self) -> Box<dyn TranslationClient>;
}

/// Infers a [`FormatType`] from a path's extension.
///
/// `.zip` is ambiguous and is not mapped.
pub fn infer_format_from_extension<P: AsRef<Path>>(path: P) -> Option<FormatType> {
    let path = path.as_ref().to_str()?;
    if path.to_ascii_lowercase().ends_with(".xcloc.zip") {
        return Some(FormatType::Xcloc);
    }
    extension_of(path)?.parse().ok()
}

/// Collects every file under `dir` with paths relative to it, `/`-separated.
fn read_dir_tree(dir: &Path) -> Result<Vec<VirtualFile>, Error> {
    let mut files = Vec::new();
    let mut pending: Vec<PathBuf> = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let relative = path
                .strip_prefix(dir)
                .map_err(|e| Error::DataMismatch(e.to_string()))?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(VirtualFile::new(relative, fs::read(&path)?));
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Turns a file or directory into an upload payload.
///
/// Directories become archives. Zip files become archives too, except DOCX,
/// which its codec reads as a single file.
pub fn payload_from_path<P: AsRef<Path>>(path: P) -> Result<UploadPayload, Error> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    if path.is_dir() {
        return Ok(UploadPayload::archive(name, read_dir_tree(path)?));
    }

    let bytes = fs::read(path)?;
    let is_docx = extension_of(&name).as_deref() == Some("docx");
    if is_zip(&bytes) && !is_docx {
        return Ok(UploadPayload::archive(name, read_zip(&bytes)?));
    }
    Ok(UploadPayload::single_file(name, bytes))
}

/// Loads a file or directory into a client of the detected (or requested)
/// format, then applies the language hints from `options`.
pub fn load_path<P: AsRef<Path>>(
    path: P,
    options: &LoadOptions,
) -> Result<Box<dyn TranslationClient>, Error> {
    let path = path.as_ref();
    let payload = payload_from_path(path)?;
    let registry = FormatRegistry::with_defaults()?;

    let mut client = match &options.format_id {
        Some(format_id) => registry.new_client(format_id)?,
        None => registry
            .resolve(&payload, options.min_confidence)
            .ok_or_else(|| Error::UnknownFormat(path.display().to_string()))?,
    };
    client.load(&payload)?;
    client.project_mut()?.apply_language_hints(
        options.source_language.as_deref(),
        options.target_language.as_deref(),
    );
    tracing::debug!(path = %path.display(), format = client.format_id(), "loaded file");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::write_zip;

    #[test]
    fn test_infer_format_from_extension() {
        assert_eq!(infer_format_from_extension("fr.po"), Some(FormatType::Po));
        assert_eq!(infer_format_from_extension("a/b.VTT"), Some(FormatType::Vtt));
        assert_eq!(
            infer_format_from_extension("App.xcloc.zip"),
            Some(FormatType::Xcloc)
        );
        assert_eq!(infer_format_from_extension("notes.md"), Some(FormatType::Markdown));
        assert_eq!(infer_format_from_extension("bundle.zip"), None);
        assert_eq!(infer_format_from_extension("Makefile"), None);
    }

    #[test]
    fn test_payload_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("de.xcloc");
        fs::create_dir_all(bundle.join("Localized Contents")).unwrap();
        fs::write(bundle.join("contents.json"), "{}").unwrap();
        fs::write(bundle.join("Localized Contents/de.xliff"), "<xliff/>").unwrap();

        let payload = payload_from_path(&bundle).unwrap();
        assert_eq!(payload.file_name(), "de.xcloc");
        let paths: Vec<_> = payload.tree().unwrap().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["Localized Contents/de.xliff", "contents.json"]);
    }

    #[test]
    fn test_payload_from_zip_and_docx() {
        let dir = tempfile::tempdir().unwrap();
        let zipped = write_zip(&[VirtualFile::new("a.txt", b"x".to_vec())]).unwrap();
        fs::write(dir.path().join("bundle.zip"), &zipped).unwrap();
        fs::write(dir.path().join("report.docx"), &zipped).unwrap();

        let archive = payload_from_path(dir.path().join("bundle.zip")).unwrap();
        assert!(archive.tree().is_some());
        let docx = payload_from_path(dir.path().join("report.docx")).unwrap();
        assert!(docx.as_single_file().is_some());
    }
}
