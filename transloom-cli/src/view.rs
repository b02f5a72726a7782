use transloom::TranslationClient;

const PREVIEW_CHARS: usize = 50;

fn shorten(value: &str, full: bool) -> String {
    if full || value.chars().count() <= PREVIEW_CHARS {
        value.to_string()
    } else {
        format!("{}...", value.chars().take(PREVIEW_CHARS).collect::<String>())
    }
}

/// Print the resources and entries of a loaded client.
pub fn print_view(client: &dyn TranslationClient, resource_filter: &Option<String>, full: bool) {
    let Ok(project) = client.project() else {
        eprintln!("No project loaded");
        std::process::exit(1);
    };

    let resources = project
        .resources
        .iter()
        .filter(|r| resource_filter.as_ref().is_none_or(|id| &r.id == id))
        .collect::<Vec<_>>();

    if resources.is_empty() {
        match resource_filter {
            Some(id) => eprintln!("No resource found with id: {}", id),
            None => eprintln!("No resources found"),
        }
        std::process::exit(1);
    }

    println!("Project: {}", project.name);
    println!("Format: {}", client.format_id());
    println!("Source language: {}", project.source_language);
    println!("Target languages: {}", project.target_languages.join(", "));

    for (i, resource) in resources.iter().enumerate() {
        println!("\n=== Resource {}: {} ===", i + 1, resource.id);
        println!("Entries: {}", resource.entries.len());

        for entry in &resource.entries {
            println!("\n  Entry {}", entry.id);
            if let Some(form) = entry.plural_form {
                println!("    Plural: {:?}", form);
            }
            if let Some(context) = &entry.context {
                println!("    Context: {}", context);
            }
            if let Some(comment) = &entry.comment {
                println!("    Comment: {}", comment);
            }
            println!("    Source: {}", shorten(&entry.source_text, full));
            println!("    Target: {}", shorten(&entry.target_text, full));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_counts_chars() {
        let long = "é".repeat(60);
        let short = shorten(&long, false);
        assert_eq!(short.chars().count(), PREVIEW_CHARS + 3);
        assert_eq!(shorten(&long, true), long);
        assert_eq!(shorten("ok", false), "ok");
    }
}
