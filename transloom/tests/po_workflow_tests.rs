use indoc::indoc;
use proptest::prelude::*;
use transloom::formats::po::{PoDocument, PoEntry, PoMsgstr, parse_po, serialize_po};
use transloom::{EntryPatch, Error, MergeStats, PoClient, TranslationClient, UploadPayload};

fn load(file_name: &str, text: &str) -> PoClient {
    let mut client = PoClient::new();
    client
        .load(&UploadPayload::single_file(file_name, text.as_bytes().to_vec()))
        .unwrap();
    client
}

fn targets(client: &PoClient) -> Vec<(String, String)> {
    client
        .project()
        .unwrap()
        .entries()
        .map(|e| (e.source_text.clone(), e.target_text.clone()))
        .collect()
}

const OLD_REVISION: &str = indoc! {r#"
    msgid ""
    msgstr ""
    "Language: de\n"

    msgid "Save"
    msgstr "Speichern"

    msgid "Cancel"
    msgstr "Abbrechen"

    msgid "Legacy"
    msgstr "Alt"
"#};

const NEW_REVISION: &str = indoc! {r#"
    msgid ""
    msgstr ""
    "Language: de\n"

    msgid "Cancel"
    msgstr ""

    msgid "Delete"
    msgstr ""

    msgid "Save"
    msgstr ""
"#};

#[test]
fn test_merge_keeps_translations_and_new_order() {
    let mut client = load("de.po", OLD_REVISION);
    let stats = client.update_from_po(NEW_REVISION, None).unwrap();
    assert_eq!(
        stats,
        MergeStats {
            added: 1,
            removed: 1,
            preserved: 2,
            duplicates: 0,
            total: 3,
        }
    );
    assert_eq!(
        targets(&client),
        vec![
            ("Cancel".to_string(), "Abbrechen".to_string()),
            ("Delete".to_string(), String::new()),
            ("Save".to_string(), "Speichern".to_string()),
        ]
    );
    let exported = String::from_utf8(client.export_file(None).unwrap().bytes).unwrap();
    assert!(exported.contains("msgid \"Save\"\nmsgstr \"Speichern\""));
    assert!(!exported.contains("Legacy"));
}

#[test]
fn test_merge_carries_edits_made_after_load() {
    let mut client = load("de.po", OLD_REVISION);
    client
        .update_entry("de.po", "1", &EntryPatch::target("Verwerfen"))
        .unwrap();
    client.update_from_po(NEW_REVISION, None).unwrap();
    let project = client.project().unwrap();
    assert_eq!(project.find_entry("de.po", "0").unwrap().target_text, "Verwerfen");
}

#[test]
fn test_merge_skips_entries_that_became_plural() {
    let old = indoc! {r#"
        msgid "%d item"
        msgstr "%d Element"
    "#};
    let new = indoc! {r#"
        msgid "%d item"
        msgid_plural "%d items"
        msgstr[0] ""
        msgstr[1] ""
    "#};
    let mut client = load("de.po", old);
    let stats = client.update_from_po(new, None).unwrap();
    assert_eq!(stats.preserved, 0);
    assert_eq!(stats.added, 0);
    assert!(
        client
            .project()
            .unwrap()
            .entries()
            .all(|e| e.target_text.is_empty())
    );
}

#[test]
fn test_failed_merge_changes_nothing() {
    let mut client = load("de.po", OLD_REVISION);
    let before = client.project().unwrap().clone();
    assert!(matches!(
        client.update_from_po("# nothing here\n", None),
        Err(Error::NoTranslatableContent(_))
    ));
    assert_eq!(client.project().unwrap(), &before);
}

const HASHED: &str = indoc! {r#"
    msgid "hzSNj4"
    msgstr ""

    msgid "Ab3_x9"
    msgstr ""

    msgid "Q1w2e3"
    msgstr ""
"#};

const REFERENCE: &str = indoc! {r#"
    msgid "hzSNj4"
    msgstr "Welcome back"

    msgid "Ab3_x9"
    msgstr "Sign out"

    msgid "Q1w2e3"
    msgstr "Open settings"
"#};

#[test]
fn test_reference_catalog_replaces_hash_sources() {
    let mut client = load("fr.po", HASHED);
    assert!(client.has_hash_based_msgids().unwrap());

    let matched = client.apply_reference_document(REFERENCE).unwrap();
    assert_eq!(matched, 3);
    let sources: Vec<_> = client
        .project()
        .unwrap()
        .entries()
        .map(|e| e.source_text.clone())
        .collect();
    assert_eq!(sources, vec!["Welcome back", "Sign out", "Open settings"]);

    // The native catalog keeps its hash keys.
    let exported = String::from_utf8(client.export_file(None).unwrap().bytes).unwrap();
    assert!(exported.contains("msgid \"hzSNj4\""));
}

#[test]
fn test_reference_catalog_rejections() {
    let mut client = load("fr.po", HASHED);
    assert!(matches!(
        client.apply_reference_document(HASHED),
        Err(Error::InvalidReference(_))
    ));

    let hashed_targets = indoc! {r#"
        msgid "hzSNj4"
        msgstr "k9Lm2p"

        msgid "Ab3_x9"
        msgstr "Zx8_y7"

        msgid "Q1w2e3"
        msgstr "Rr5tt6"
    "#};
    assert!(matches!(
        client.apply_reference_document(hashed_targets),
        Err(Error::InvalidReference(_))
    ));

    let unrelated = indoc! {r#"
        msgid "something else"
        msgstr "Quelque chose"
    "#};
    assert!(matches!(
        client.apply_reference_document(unrelated),
        Err(Error::InvalidReference(_))
    ));
    assert_eq!(
        client.project().unwrap().entries().next().unwrap().source_text,
        "hzSNj4"
    );
}

#[test]
fn test_merge_with_reference() {
    let mut client = load("fr.po", HASHED);
    let revision = format!("{}\nmsgid \"Zz9yy8\"\nmsgstr \"\"\n", HASHED);
    let stats = client.update_from_po(&revision, Some(REFERENCE)).unwrap();
    assert_eq!(stats.added, 1);
    assert_eq!(stats.total, 4);
    let first = client.project().unwrap().entries().next().unwrap().clone();
    assert_eq!(first.source_text, "Welcome back");
}

fn text_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9 _\\-\\.,!\\?\"']{1,30}").expect("valid text regex")
}

fn catalog_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map(text_strategy(), text_strategy(), 1..8)
        .prop_map(|m| m.into_iter().collect())
}

fn build_document(pairs: &[(String, String)]) -> PoDocument {
    PoDocument {
        entries: pairs
            .iter()
            .map(|(msgid, msgstr)| PoEntry::new(msgid.clone(), msgstr.clone()))
            .collect(),
        ..PoDocument::default()
    }
}

proptest! {
    #[test]
    fn prop_po_serialization_round_trips(pairs in catalog_strategy()) {
        let text = serialize_po(&build_document(&pairs));
        let parsed = parse_po(&text);
        let read_back: Vec<_> = parsed
            .entries
            .iter()
            .map(|e| (e.msgid.clone(), e.msgstr.clone()))
            .collect();
        let expected: Vec<_> = pairs
            .iter()
            .map(|(id, s)| (id.clone(), PoMsgstr::Singular(s.clone())))
            .collect();
        prop_assert_eq!(read_back, expected);
        prop_assert_eq!(serialize_po(&parsed), text);
    }

    #[test]
    fn prop_unedited_client_exports_same_entries(pairs in catalog_strategy()) {
        let text = serialize_po(&build_document(&pairs));
        let client = load("x.po", &text);
        let exported = String::from_utf8(client.export_file(None).unwrap().bytes).unwrap();
        prop_assert_eq!(parse_po(&exported).entries, parse_po(&text).entries);
    }
}
