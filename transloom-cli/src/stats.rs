use serde_json::json;
use transloom::{TranslationClient, TranslationResource};

#[derive(Default)]
struct ResourceStats {
    total: usize,
    translated: usize,
    plural_entries: usize,
}

impl ResourceStats {
    fn of(resource: &TranslationResource) -> Self {
        let mut stats = ResourceStats::default();
        for entry in &resource.entries {
            stats.total += 1;
            if entry.is_translated() {
                stats.translated += 1;
            }
            if entry.plural_form.is_some() {
                stats.plural_entries += 1;
            }
        }
        stats
    }

    fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.translated as f64) * 100.0 / (self.total as f64)
        }
    }
}

pub fn print_stats(client: &dyn TranslationClient, json_output: bool) {
    let Ok(project) = client.project() else {
        eprintln!("No project loaded");
        std::process::exit(1);
    };

    if json_output {
        let per_resource: Vec<_> = project
            .resources
            .iter()
            .map(|res| {
                let stats = ResourceStats::of(res);
                json!({
                    "resource": res.id,
                    "total": stats.total,
                    "translated": stats.translated,
                    "untranslated": stats.total - stats.translated,
                    "plural_entries": stats.plural_entries,
                    "completion_percent": (stats.percent() * 100.0).round() / 100.0,
                })
            })
            .collect();
        let body = json!({
            "summary": {
                "format": client.format_id(),
                "resources": project.resources.len(),
                "entries": project.entry_count(),
                "translated": project.translated_count(),
                "source_language": project.source_language,
                "target_languages": project.target_languages,
            },
            "resources": per_resource,
        });
        match serde_json::to_string_pretty(&body) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing to JSON: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("=== Stats ===");
    println!("Format: {}", client.format_id());
    println!("Resources: {}", project.resources.len());
    println!(
        "Entries: {} ({} translated)",
        project.entry_count(),
        project.translated_count()
    );

    for res in &project.resources {
        let stats = ResourceStats::of(res);
        println!("\nResource: {}", res.id);
        println!("  Total: {}", stats.total);
        println!("  Translated: {}", stats.translated);
        println!("  Untranslated: {}", stats.total - stats.translated);
        if stats.plural_entries > 0 {
            println!("  Plural forms: {}", stats.plural_entries);
        }
        println!("  Completion: {:.2}%", stats.percent());
    }
}
