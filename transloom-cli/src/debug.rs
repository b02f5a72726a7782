use std::fs::File;
use std::io::Write;

use crate::load::{LoadArgs, load_or_exit, spinner};

/// Run the debug command: load a localization file and output its project as JSON.
pub fn run_debug_command(load: LoadArgs, output: Option<String>) {
    let progress_bar = spinner();
    let client = load_or_exit(&load, &progress_bar);

    progress_bar.set_message("Converting to JSON...");
    let json = client
        .project()
        .map_err(|e| e.to_string())
        .and_then(|p| serde_json::to_string_pretty(p).map_err(|e| e.to_string()))
        .unwrap_or_else(|e| {
            progress_bar.finish_with_message("❌ Error serializing to JSON");
            eprintln!("Error serializing to JSON: {}", e);
            std::process::exit(1);
        });

    match output {
        Some(output_path) => {
            progress_bar.set_message("Writing output file...");
            if let Err(e) =
                File::create(&output_path).and_then(|mut f| f.write_all(json.as_bytes()))
            {
                progress_bar.finish_with_message("❌ Error writing output file");
                eprintln!("Error writing to {}: {}", output_path, e);
                std::process::exit(1);
            }
            progress_bar
                .finish_with_message(format!("✅ Debug output written to: {}", output_path));
        }
        None => {
            progress_bar.finish_with_message("✅ Debug output:");
            println!("{}", json);
        }
    }
}
