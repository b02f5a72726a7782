mod apply;
mod debug;
mod detect;
mod load;
mod stats;
mod update;
mod view;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    apply::run_apply_command,
    debug::run_debug_command,
    detect::run_detect_command,
    load::{LoadArgs, load_or_exit, spinner},
    stats::print_stats,
    update::run_update_command,
    view::print_view,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log library activity to stderr (repeat for more detail); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which formats recognize a file, best first.
    Detect {
        /// The input file or bundle directory
        #[arg(short, long)]
        input: String,

        /// Print the ranking as JSON
        #[arg(long)]
        json: bool,
    },

    /// View the entries of a localization file.
    View {
        #[command(flatten)]
        load: LoadArgs,

        /// Only show the resource with this id
        #[arg(short, long)]
        resource: Option<String>,

        /// Display full text without truncation
        #[arg(long)]
        full: bool,
    },

    /// Show translation progress.
    Stats {
        #[command(flatten)]
        load: LoadArgs,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Dump the loaded project as JSON.
    Debug {
        #[command(flatten)]
        load: LoadArgs,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Merge a new revision of a PO catalog into an existing translation.
    Update {
        /// The translated catalog
        #[arg(short, long)]
        input: String,

        /// The new revision (template or re-extracted catalog)
        #[arg(short = 'n', long)]
        revision: String,

        /// A catalog with readable text for hash-keyed msgids
        #[arg(long)]
        reference: Option<String>,

        /// Where to write the merged catalog
        #[arg(short, long)]
        output: String,

        /// Print merge statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply entry updates from a JSON file and export.
    Apply {
        #[command(flatten)]
        load: LoadArgs,

        /// JSON array of `{resourceId, entryId, targetText?, comment?}`
        #[arg(short, long)]
        updates: String,

        /// JSON array of glossary terms to write next to the output
        #[arg(long)]
        terms: Option<String>,

        /// Where to write the exported file
        #[arg(short, long)]
        output: String,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.commands {
        Commands::Detect { input, json } => run_detect_command(input, json),
        Commands::View {
            load,
            resource,
            full,
        } => {
            let progress_bar = spinner();
            let client = load_or_exit(&load, &progress_bar);
            progress_bar.finish_and_clear();
            print_view(client.as_ref(), &resource, full);
        }
        Commands::Stats { load, json } => {
            let progress_bar = spinner();
            let client = load_or_exit(&load, &progress_bar);
            progress_bar.finish_and_clear();
            print_stats(client.as_ref(), json);
        }
        Commands::Debug { load, output } => run_debug_command(load, output),
        Commands::Update {
            input,
            revision,
            reference,
            output,
            json,
        } => run_update_command(input, revision, reference, output, json),
        Commands::Apply {
            load,
            updates,
            terms,
            output,
        } => run_apply_command(load, updates, terms, output),
    }
}
