use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn transloom_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("transloom"))
}

const PO: &str = r#"msgid ""
msgstr ""
"Language: fr\n"

msgid "Hello"
msgstr "Bonjour"

msgid "Goodbye"
msgstr ""
"#;

const SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nBye\n";

fn assert_success(output: &std::process::Output) {
    assert!(
        output.status.success(),
        "CLI failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_detect_json_ranks_po_first() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("fr.po");
    fs::write(&input, PO).unwrap();

    let output = transloom_cmd()
        .args(["detect", "-i", input.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert_success(&output);

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v[0]["formatId"], "po");
    assert_eq!(v[0]["score"], 1.0);
}

#[test]
fn test_stats_json_on_po() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("fr.po");
    fs::write(&input, PO).unwrap();

    let output = transloom_cmd()
        .args(["stats", "-i", input.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert_success(&output);

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["summary"]["format"], "po");
    assert_eq!(v["summary"]["entries"], 2);
    assert_eq!(v["summary"]["translated"], 1);
    assert_eq!(v["resources"][0]["completion_percent"], 50.0);
}

#[test]
fn test_view_prints_entries() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("fr.po");
    fs::write(&input, PO).unwrap();

    let output = transloom_cmd()
        .args(["view", "-i", input.to_str().unwrap()])
        .output()
        .unwrap();
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Target languages: fr"));
    assert!(stdout.contains("Source: Hello"));
    assert!(stdout.contains("Target: Bonjour"));
}

#[test]
fn test_update_merges_revision() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("fr.po");
    let revision = dir.path().join("messages.pot");
    let merged = dir.path().join("merged.po");
    fs::write(&input, PO).unwrap();
    fs::write(
        &revision,
        "msgid \"Hello\"\nmsgstr \"\"\n\nmsgid \"Welcome\"\nmsgstr \"\"\n",
    )
    .unwrap();

    let output = transloom_cmd()
        .args([
            "update",
            "-i",
            input.to_str().unwrap(),
            "-n",
            revision.to_str().unwrap(),
            "-o",
            merged.to_str().unwrap(),
            "--json",
        ])
        .output()
        .unwrap();
    assert_success(&output);

    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["preserved"], 1);
    assert_eq!(stats["added"], 1);
    assert_eq!(stats["removed"], 1);
    let text = fs::read_to_string(&merged).unwrap();
    assert!(text.contains("msgid \"Hello\"\nmsgstr \"Bonjour\""));
    assert!(!text.contains("Goodbye"));
}

#[test]
fn test_apply_updates_subtitles_with_glossary() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("movie.srt");
    let updates = dir.path().join("updates.json");
    let terms = dir.path().join("terms.json");
    let out = dir.path().join("movie.fr.srt");
    fs::write(&input, SRT).unwrap();
    fs::write(
        &updates,
        r#"[{"resourceId": "movie.srt", "entryId": "2", "targetText": "Salut"}]"#,
    )
    .unwrap();
    fs::write(&terms, r#"[{"source": "Bye", "target": "Salut"}]"#).unwrap();

    let output = transloom_cmd()
        .args([
            "apply",
            "-i",
            input.to_str().unwrap(),
            "-u",
            updates.to_str().unwrap(),
            "--terms",
            terms.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert_success(&output);

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains("00:00:03,000 --> 00:00:04,000\nSalut"));
    assert!(text.contains("00:00:01,000 --> 00:00:02,000\nHello"));
    assert!(dir.path().join("movie.glossary.csv").exists());
}

#[test]
fn test_apply_unknown_entry_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("movie.srt");
    let updates = dir.path().join("updates.json");
    let out = dir.path().join("out.srt");
    fs::write(&input, SRT).unwrap();
    fs::write(
        &updates,
        r#"[{"resourceId": "movie.srt", "entryId": "7", "targetText": "?"}]"#,
    )
    .unwrap();

    let output = transloom_cmd()
        .args([
            "apply",
            "-i",
            input.to_str().unwrap(),
            "-u",
            updates.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!out.exists());
}

#[test]
fn test_unrecognized_input_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("data.bin");
    fs::write(&input, [0u8, 159, 146, 150]).unwrap();

    let output = transloom_cmd()
        .args(["view", "-i", input.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error reading"));
}
