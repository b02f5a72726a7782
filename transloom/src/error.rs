//! All error types for the transloom crate.
//!
//! These are returned from all fallible operations (parsing, serialization,
//! detection, merging, export). [`Envelope`] wraps a result for callers that
//! hand results across a JSON boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown format `{0}`")]
    UnknownFormat(String),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("CSV error: {0}")]
    CsvParse(#[from] csv::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported payload: {0}")]
    UnsupportedPayload(String),

    #[error("no translatable content: {0}")]
    NoTranslatableContent(String),

    #[error("invalid reference file: {0}")]
    InvalidReference(String),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("invalid data: {0}")]
    DataMismatch(String),

    #[error("no document loaded")]
    NotLoaded,

    #[error("entry `{entry}` not found in resource `{resource}`")]
    EntryNotFound { resource: String, entry: String },

    #[error("format `{0}` is already registered")]
    DuplicateFormat(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("collaborator error: {message}")]
    Collaborator {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new collaborator error (translation agent, project store) with
    /// an optional source error.
    pub fn collaborator_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Collaborator {
            message: message.into(),
            source,
        }
    }

    /// Creates a new validation error
    pub fn validation_error(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub(crate) fn entry_not_found(resource: &str, entry: &str) -> Self {
        Error::EntryNotFound {
            resource: resource.to_string(),
            entry: entry.to_string(),
        }
    }
}

/// Serializable result envelope.
///
/// Serializes as `{"hasError": false, "data": ...}` on success and
/// `{"hasError": true, "errorMessage": "..."}` on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub has_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub error_message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope {
            has_error: false,
            data: Some(data),
            error_message: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Envelope {
            has_error: true,
            data: None,
            error_message: Some(message.into()),
        }
    }

    /// Converts the envelope back into a `Result`, mapping failures to
    /// [`Error::Validation`] since the original error type is not preserved.
    pub fn into_result(self) -> Result<T, Error> {
        match (self.has_error, self.data) {
            (false, Some(data)) => Ok(data),
            _ => Err(Error::Validation(
                self.error_message
                    .unwrap_or_else(|| "envelope carries no data".to_string()),
            )),
        }
    }
}

impl<T> From<Result<T, Error>> for Envelope<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(e) => Envelope::err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unknown_format_error() {
        let error = Error::UnknownFormat("invalid_format".to_string());
        assert_eq!(error.to_string(), "unknown format `invalid_format`");
    }

    #[test]
    fn test_parse_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let error = Error::Parse(json_error);
        assert!(error.to_string().contains("parse error"));
    }

    #[test]
    fn test_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::Io(io_error);
        assert!(error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_no_translatable_content_error() {
        let error = Error::NoTranslatableContent("no PO entries found".to_string());
        assert_eq!(
            error.to_string(),
            "no translatable content: no PO entries found"
        );
    }

    #[test]
    fn test_entry_not_found_error() {
        let error = Error::entry_not_found("messages", "42");
        assert_eq!(
            error.to_string(),
            "entry `42` not found in resource `messages`"
        );
    }

    #[test]
    fn test_collaborator_error_with_source() {
        let source_error = Box::new(io::Error::new(io::ErrorKind::Other, "store offline"));
        let error = Error::collaborator_error("save failed", Some(source_error));
        assert!(error.to_string().contains("collaborator error: save failed"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_envelope_from_ok() {
        let envelope: Envelope<u32> = Ok(3).into();
        assert!(!envelope.has_error);
        assert_eq!(envelope.data, Some(3));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json, serde_json::json!({"hasError": false, "data": 3}));
    }

    #[test]
    fn test_envelope_from_err() {
        let envelope: Envelope<u32> = Err(Error::NotLoaded).into();
        assert!(envelope.has_error);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"hasError": true, "errorMessage": "no document loaded"})
        );
        assert!(envelope.into_result().is_err());
    }
}
