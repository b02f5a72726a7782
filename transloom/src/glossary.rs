//! Terminology handed to `export_file`, written as a CSV companion file.

use serde::{Deserialize, Serialize};

use crate::{error::Error, types::VirtualFile};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Term {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl Term {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Term {
            source: source.into(),
            target: target.into(),
            note: None,
        }
    }
}

/// Name of the glossary written next to an export of `file_name`.
pub fn glossary_file_name(file_name: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    format!("{}.glossary.csv", stem)
}

/// Writes the terms as CSV with a `source,target,note` header row.
pub fn terms_to_csv(terms: &[Term]) -> Result<Vec<u8>, Error> {
    let mut wtr = csv::WriterBuilder::new().from_writer(Vec::new());
    for term in terms {
        wtr.serialize(term)?;
    }
    wtr.into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}

/// The companion file for an export, or `None` when there are no terms.
pub fn glossary_file(file_name: &str, terms: Option<&[Term]>) -> Result<Option<VirtualFile>, Error> {
    match terms {
        Some(terms) if !terms.is_empty() => Ok(Some(VirtualFile::new(
            glossary_file_name(file_name),
            terms_to_csv(terms)?,
        ))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_to_csv() {
        let mut cloud = Term::new("cloud", "nuage");
        cloud.note = Some("noun, \"weather\"".to_string());
        let csv = terms_to_csv(&[Term::new("file", "fichier"), cloud]).unwrap();
        assert_eq!(
            String::from_utf8(csv).unwrap(),
            "source,target,note\nfile,fichier,\ncloud,nuage,\"noun, \"\"weather\"\"\"\n"
        );
    }

    #[test]
    fn test_glossary_file_name() {
        assert_eq!(glossary_file_name("fr.po"), "fr.glossary.csv");
        assert_eq!(glossary_file_name("App.de.xcloc"), "App.de.glossary.csv");
        assert_eq!(glossary_file_name("README"), "README.glossary.csv");
    }

    #[test]
    fn test_no_terms_no_file() {
        assert_eq!(glossary_file("fr.po", None).unwrap(), None);
        assert_eq!(glossary_file("fr.po", Some(&[])).unwrap(), None);
        let file = glossary_file("fr.po", Some(&[Term::new("a", "b")])).unwrap().unwrap();
        assert_eq!(file.path, "fr.glossary.csv");
    }
}
