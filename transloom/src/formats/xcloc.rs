//! Support for Xcode localization bundles (`.xcloc`).
//!
//! A bundle is a directory (usually shipped zipped) holding a `contents.json`
//! descriptor and one XLIFF file under `Localized Contents/`. Only the XLIFF
//! member is ever rewritten; every other member passes through untouched.

use serde::{Deserialize, Serialize};

use crate::{
    archive::replace_members,
    error::Error,
    formats::xliff::{XliffDocument, parse_xliff, serialize_xliff},
    types::VirtualFile,
};

pub const CONTENTS_FILE_NAME: &str = "contents.json";
const LOCALIZED_CONTENTS_DIR: &str = "Localized Contents/";

/// The `contents.json` descriptor. Unknown fields are kept as-is.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentsJson {
    pub development_region: String,
    pub target_locale: String,
    pub tool_info: ToolInfo,
    pub version: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolInfo {
    #[serde(rename = "toolID")]
    pub tool_id: String,
    #[serde(rename = "toolName")]
    pub tool_name: String,
    #[serde(rename = "toolVersion")]
    pub tool_version: String,
    #[serde(rename = "toolBuildNumber", skip_serializing_if = "Option::is_none", default)]
    pub tool_build_number: Option<String>,
}

/// Parses and validates `contents.json`. Missing or empty required fields
/// are an error.
pub fn parse_contents_json(text: &str) -> Result<ContentsJson, Error> {
    let contents: ContentsJson = serde_json::from_str(text)?;
    for (field, value) in [
        ("developmentRegion", &contents.development_region),
        ("targetLocale", &contents.target_locale),
        ("version", &contents.version),
    ] {
        if value.trim().is_empty() {
            return Err(Error::InvalidResource(format!(
                "contents.json field `{}` is empty",
                field
            )));
        }
    }
    Ok(contents)
}

/// A loaded bundle: descriptor, parsed XLIFF, and the original member list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XclocBundle {
    pub contents: ContentsJson,
    pub xliff_path: String,
    pub xliff: XliffDocument,
    pub members: Vec<VirtualFile>,
}

fn is_xliff_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".xliff") || lower.ends_with(".xlf")
}

/// Path of the XLIFF member: the one under `Localized Contents/` if present,
/// otherwise the first `.xliff` anywhere in the tree.
pub fn find_xliff_member(tree: &[VirtualFile]) -> Option<&VirtualFile> {
    tree.iter()
        .find(|f| f.path.contains(LOCALIZED_CONTENTS_DIR) && is_xliff_path(&f.path))
        .or_else(|| tree.iter().find(|f| is_xliff_path(&f.path)))
}

pub fn find_contents_member(tree: &[VirtualFile]) -> Option<&VirtualFile> {
    tree.iter().find(|f| f.file_name() == CONTENTS_FILE_NAME)
}

impl XclocBundle {
    pub fn from_tree(tree: &[VirtualFile]) -> Result<Self, Error> {
        let contents_file = find_contents_member(tree).ok_or_else(|| {
            Error::NoTranslatableContent("bundle has no contents.json".to_string())
        })?;
        let contents = parse_contents_json(&contents_file.text()?)?;

        let xliff_file = find_xliff_member(tree)
            .ok_or_else(|| Error::NoTranslatableContent("bundle has no XLIFF file".to_string()))?;
        let xliff = parse_xliff(&xliff_file.text()?)?;

        tracing::debug!(
            xliff = %xliff_file.path,
            target = %contents.target_locale,
            "loaded xcloc bundle"
        );

        Ok(XclocBundle {
            contents,
            xliff_path: xliff_file.path.clone(),
            xliff,
            members: tree.to_vec(),
        })
    }

    /// Member list with the XLIFF member re-serialized.
    pub fn export_tree(&self) -> Result<Vec<VirtualFile>, Error> {
        let xliff = serialize_xliff(&self.xliff)?;
        Ok(replace_members(
            &self.members,
            &[(self.xliff_path.as_str(), xliff.into_bytes())],
        ))
    }
}
