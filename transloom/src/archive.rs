//! Zip helpers for bundle formats (`.xcloc`, `.docx`).
//!
//! Archives are handled as a flat list of [`VirtualFile`]s; directory entries
//! are implied by member paths.

use std::io::{Cursor, Read, Write};

use zip::{CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions};

use crate::{error::Error, types::VirtualFile};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const EMPTY_ZIP_MAGIC: &[u8] = b"PK\x05\x06";

/// Largest decompressed size accepted for one archive member.
pub const MAX_MEMBER_BYTES: u64 = 256 * 1024 * 1024;

/// Whether `bytes` start with a zip local file header (or are an empty zip).
pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(EMPTY_ZIP_MAGIC)
}

/// Reads every file member of a zip archive, in archive order.
pub fn read_zip(bytes: &[u8]) -> Result<Vec<VirtualFile>, Error> {
    read_zip_limited(bytes, MAX_MEMBER_BYTES)
}

/// Member sizes in the archive headers are not trusted; reading stops one
/// byte past `member_limit`.
fn read_zip_limited(bytes: &[u8], member_limit: u64) -> Result<Vec<VirtualFile>, Error> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let mut files = Vec::new();
    for i in 0..zip.len() {
        let mut member = zip.by_index(i)?;
        if member.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        (&mut member)
            .take(member_limit.saturating_add(1))
            .read_to_end(&mut data)?;
        if data.len() as u64 > member_limit {
            return Err(Error::UnsupportedPayload(format!(
                "zip member `{}` is larger than {} bytes",
                member.name(),
                member_limit
            )));
        }
        files.push(VirtualFile::new(member.name(), data));
    }
    tracing::debug!(members = files.len(), "read zip archive");
    Ok(files)
}

/// Writes `files` into a new deflated zip archive, preserving their order.
pub fn write_zip(files: &[VirtualFile]) -> Result<Vec<u8>, Error> {
    let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for file in files {
        zout.start_file(file.path.as_str(), opts)?;
        zout.write_all(&file.content)?;
    }
    Ok(zout.finish()?.into_inner())
}

/// Rebuilds an archive tree with some members replaced. Every other member
/// keeps its original bytes.
pub fn replace_members(
    tree: &[VirtualFile],
    replacements: &[(&str, Vec<u8>)],
) -> Vec<VirtualFile> {
    tree.iter()
        .map(|file| {
            match replacements.iter().find(|(path, _)| *path == file.path) {
                Some((_, content)) => VirtualFile::new(file.path.clone(), content.clone()),
                None => file.clone(),
            }
        })
        .collect()
}

/// Serde adapter storing bytes as standard base64 strings in JSON.
pub mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD as B64};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&B64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        B64.decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
