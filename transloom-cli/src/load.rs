use indicatif::{ProgressBar, ProgressStyle};
use transloom::read_options::DEFAULT_MIN_CONFIDENCE;
use transloom::{LoadOptions, TranslationClient, load_path};

/// Input file plus the knobs that steer format detection.
#[derive(clap::Args, Debug, Clone)]
pub struct LoadArgs {
    /// The input file or bundle directory
    #[arg(short, long)]
    pub input: String,

    /// Skip detection and load with this format id (po, xcloc, srt, vtt, html, document)
    #[arg(long)]
    pub format: Option<String>,

    /// Override the source language reported by the file
    #[arg(long)]
    pub source_lang: Option<String>,

    /// Override the target language reported by the file
    #[arg(long)]
    pub target_lang: Option<String>,

    /// Lowest detection score accepted
    #[arg(long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
    pub min_confidence: f32,
}

impl LoadArgs {
    pub fn options(&self) -> LoadOptions {
        LoadOptions::new()
            .with_format(self.format.clone())
            .with_source_language(self.source_lang.clone())
            .with_target_language(self.target_lang.clone())
            .with_min_confidence(self.min_confidence)
    }
}

pub fn spinner() -> ProgressBar {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress_bar
}

/// Loads the input or exits with status 1.
pub fn load_or_exit(args: &LoadArgs, progress_bar: &ProgressBar) -> Box<dyn TranslationClient> {
    progress_bar.set_message(format!("Reading {}...", args.input));
    match load_path(&args.input, &args.options()) {
        Ok(client) => client,
        Err(e) => {
            progress_bar.finish_with_message("❌ Error reading input file");
            eprintln!("Error reading {}: {}", args.input, e);
            std::process::exit(1);
        }
    }
}

/// Prints `message` and exits with status 1.
pub fn fail(progress_bar: &ProgressBar, status: &str, message: String) -> ! {
    progress_bar.finish_with_message(format!("❌ {}", status));
    eprintln!("Error: {}", message);
    std::process::exit(1);
}
