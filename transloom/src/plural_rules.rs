//! Mapping from gettext plural form indices to CLDR plural categories.
//!
//! gettext only says how many forms a language has (`nplurals`); editors want
//! a category name per form. When the target language is known and its CLDR
//! category set has exactly `nplurals` members, the CLDR set is used.
//! Otherwise a fixed table keyed by `nplurals` applies.

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use unic_langid::LanguageIdentifier;

use crate::types::PluralCategory;

lazy_static! {
    /// Static mapping from base language subtag → plural categories (CLDR‑style, cardinals).
    static ref CATEGORY_TABLE: BTreeMap<&'static str, BTreeSet<PluralCategory>> = {
        use PluralCategory::*;
        let mut m: BTreeMap<&'static str, BTreeSet<PluralCategory>> = BTreeMap::new();

        fn s(items: &[PluralCategory]) -> BTreeSet<PluralCategory> {
            items.iter().cloned().collect()
        }

        // One/Other
        for code in [
            "en","de","nl","sv","da","nb","nn","no","is","fi","et","fa","hi","bn","gu",
            "ta","te","kn","ml","mr","it","es","pt","mk","el","eu","gl","af","sw","ur",
            "fil","tl","tr","id","ms","fr","hy","kab"
        ] {
            m.insert(code, s(&[One, Other]));
        }

        // Only Other
        for code in ["ja","zh","ko","th","vi","km","lo","my","yue"] {
            m.insert(code, s(&[Other]));
        }

        // Slavic (Russian group)
        for code in ["ru","uk","be","sr","hr","bs","sh"] {
            m.insert(code, s(&[One, Few, Many, Other]));
        }

        m.insert("pl", s(&[One, Few, Many, Other]));

        for code in ["cs","sk"] {
            m.insert(code, s(&[One, Few, Other]));
        }

        m.insert("sl", s(&[One, Two, Few, Other]));
        m.insert("lt", s(&[One, Few, Other]));
        m.insert("lv", s(&[Zero, One, Other]));
        m.insert("ga", s(&[One, Two, Few, Many, Other]));
        m.insert("ro", s(&[One, Few, Other]));
        m.insert("ar", s(&[Zero, One, Two, Few, Many, Other]));

        for code in ["he","iw"] {
            m.insert(code, s(&[One, Two, Many, Other]));
        }

        m
    };
}

/// Fixed categories for a form count, used when no locale data fits.
pub fn categories_for_nplurals(nplurals: usize) -> Vec<PluralCategory> {
    use PluralCategory::*;
    match nplurals {
        0 | 1 => vec![Other],
        2 => vec![One, Other],
        3 => vec![One, Few, Other],
        6 => vec![Zero, One, Two, Few, Many, Other],
        _ => vec![One, Few, Many, Other],
    }
}

/// CLDR categories of a language, if the language is in the table.
pub fn language_categories(language: &str) -> Option<BTreeSet<PluralCategory>> {
    let normalized = language.replace('_', "-");
    let parsed: LanguageIdentifier = normalized.parse().ok()?;
    CATEGORY_TABLE.get(parsed.language.as_str()).cloned()
}

/// Category of the plural form `index` for a document with `nplurals` forms.
///
/// Indices past the end of the chosen table map to `Other`.
pub fn category_for_index(
    index: usize,
    nplurals: usize,
    language: Option<&str>,
) -> PluralCategory {
    if let Some(categories) = language.and_then(language_categories)
        && categories.len() == nplurals
    {
        return categories
            .into_iter()
            .nth(index)
            .unwrap_or(PluralCategory::Other);
    }
    categories_for_nplurals(nplurals)
        .get(index)
        .copied()
        .unwrap_or(PluralCategory::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use PluralCategory::*;

    #[test]
    fn test_fixed_table() {
        assert_eq!(categories_for_nplurals(1), vec![Other]);
        assert_eq!(categories_for_nplurals(2), vec![One, Other]);
        assert_eq!(categories_for_nplurals(3), vec![One, Few, Other]);
        assert_eq!(categories_for_nplurals(4), vec![One, Few, Many, Other]);
        assert_eq!(categories_for_nplurals(6).len(), 6);
    }

    #[test]
    fn test_two_forms_without_language() {
        assert_eq!(category_for_index(0, 2, None), One);
        assert_eq!(category_for_index(1, 2, None), Other);
    }

    #[test]
    fn test_language_data_wins_when_count_matches() {
        // Slovenian has four forms including `two`.
        assert_eq!(category_for_index(1, 4, Some("sl")), Two);
        // Irish has five; the fixed table would fold index 4 into `Other` too.
        assert_eq!(category_for_index(3, 5, Some("ga")), Many);
        assert_eq!(category_for_index(4, 5, Some("ga")), Other);
    }

    #[test]
    fn test_language_data_ignored_when_count_differs() {
        // Russian PO files use three forms; CLDR lists four.
        assert_eq!(category_for_index(2, 3, Some("ru")), Other);
        assert_eq!(category_for_index(1, 3, Some("ru_RU")), Few);
    }

    #[test]
    fn test_out_of_range_index() {
        assert_eq!(category_for_index(7, 2, None), Other);
        assert_eq!(category_for_index(4, 5, None), Other);
    }
}
