use transloom::{FormatRegistry, payload_from_path};

use crate::load::{fail, spinner};

/// Run the detect command: rank every codec's confidence for the input.
pub fn run_detect_command(input: String, json_output: bool) {
    let progress_bar = spinner();
    progress_bar.set_message("Detecting format...");

    let registry = FormatRegistry::with_defaults()
        .unwrap_or_else(|e| fail(&progress_bar, "Error building registry", e.to_string()));
    let payload = payload_from_path(&input)
        .unwrap_or_else(|e| fail(&progress_bar, "Error reading input file", format!("{}: {}", input, e)));
    let matches = registry.detect_all(&payload);

    if matches.is_empty() {
        fail(
            &progress_bar,
            "No format recognized",
            format!("no codec recognizes {}", input),
        );
    }
    progress_bar.finish_with_message(format!("✅ {} candidate format(s)", matches.len()));

    if json_output {
        match serde_json::to_string_pretty(&matches) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing to JSON: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    for m in &matches {
        println!(
            "{:<10} {:.2}  {}",
            m.format_id, m.detection.score, m.detection.reason
        );
    }
}
