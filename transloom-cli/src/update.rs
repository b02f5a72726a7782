use std::fs;

use serde_json::json;
use transloom::{PoClient, TranslationClient, payload_from_path};

use crate::load::{fail, spinner};

/// Run the update command: merge a new revision of a PO catalog into the
/// translations of an existing one and write the result.
pub fn run_update_command(
    input: String,
    revision: String,
    reference: Option<String>,
    output: String,
    json_output: bool,
) {
    let progress_bar = spinner();

    progress_bar.set_message(format!("Reading {}...", input));
    let payload = payload_from_path(&input)
        .unwrap_or_else(|e| fail(&progress_bar, "Error reading input file", format!("{}: {}", input, e)));
    let mut client = PoClient::new();
    if let Err(e) = client.load(&payload) {
        fail(&progress_bar, "Error reading input file", format!("{}: {}", input, e));
    }

    let read_text = |path: &str| {
        fs::read_to_string(path).unwrap_or_else(|e| {
            fail(&progress_bar, "Error reading input file", format!("{}: {}", path, e))
        })
    };
    let revision_text = read_text(&revision);
    let reference_text = reference.as_deref().map(read_text);

    progress_bar.set_message("Merging translations...");
    let stats = client
        .update_from_po(&revision_text, reference_text.as_deref())
        .unwrap_or_else(|e| fail(&progress_bar, "Error merging catalogs", e.to_string()));

    progress_bar.set_message("Writing merged output...");
    let exported = client
        .export_file(None)
        .unwrap_or_else(|e| fail(&progress_bar, "Error exporting catalog", e.to_string()));
    if let Err(e) = fs::write(&output, &exported.bytes) {
        fail(&progress_bar, "Error writing output file", format!("{}: {}", output, e));
    }
    progress_bar.finish_with_message(format!("✅ Merged catalog written to: {}", output));

    if json_output {
        println!(
            "{}",
            json!({
                "added": stats.added,
                "removed": stats.removed,
                "preserved": stats.preserved,
                "duplicates": stats.duplicates,
                "total": stats.total,
            })
        );
    } else {
        println!(
            "Added: {}\nRemoved: {}\nPreserved: {}\nDuplicates: {}\nTotal: {}",
            stats.added, stats.removed, stats.preserved, stats.duplicates, stats.total
        );
    }
}
