use std::fs;
use std::path::Path;

use transloom::{EntryUpdate, Term};

use crate::load::{LoadArgs, fail, load_or_exit, spinner};

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {}", path, e))
}

/// Run the apply command: apply a JSON array of entry updates and export
/// the file in its own format. With `terms`, a glossary CSV is written next
/// to the output.
pub fn run_apply_command(
    load: LoadArgs,
    updates: String,
    terms: Option<String>,
    output: String,
) {
    let progress_bar = spinner();
    let mut client = load_or_exit(&load, &progress_bar);

    progress_bar.set_message("Applying updates...");
    let updates: Vec<EntryUpdate> = read_json(&updates)
        .unwrap_or_else(|e| fail(&progress_bar, "Error reading updates", e));
    let terms: Option<Vec<Term>> = terms.as_deref().map(|path| {
        read_json(path).unwrap_or_else(|e| fail(&progress_bar, "Error reading terms", e))
    });
    if let Err(e) = client.update_entries(&updates) {
        fail(&progress_bar, "Error applying updates", e.to_string());
    }

    progress_bar.set_message("Exporting...");
    let exported = client
        .export_file(terms.as_deref())
        .unwrap_or_else(|e| fail(&progress_bar, "Error exporting file", e.to_string()));
    if let Err(e) = fs::write(&output, &exported.bytes) {
        fail(&progress_bar, "Error writing output file", format!("{}: {}", output, e));
    }
    if let Some(glossary) = &exported.glossary {
        let dir = Path::new(&output).parent().unwrap_or(Path::new(""));
        let path = dir.join(&glossary.path);
        if let Err(e) = fs::write(&path, &glossary.content) {
            fail(
                &progress_bar,
                "Error writing glossary",
                format!("{}: {}", path.display(), e),
            );
        }
    }
    progress_bar.finish_with_message(format!(
        "✅ Applied {} update(s), written to: {}",
        updates.len(),
        output
    ));
}
