//! bibsync command line
//!
//! Merges BibTeX files into a main collection, removes duplicates and answers
//! questions about which entries a collection is missing.

use std::error::Error;
use std::path::{Path, PathBuf};

use bibsync_bibtex::{write_entry, BibEntry};
use bibsync_core::audit::{find_by_title, find_key, missing_from, remap_keys, RemapOutcome};
use bibsync_core::library;
use bibsync_core::{merge_into, DedupePasses, MergeReport, SyncConfig};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn Error>>;

// === CLI Definition ===

#[derive(Parser)]
#[command(
    name = "bibsync",
    about = "Merge and deduplicate BibTeX collections",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ./bibsync.toml, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Main collection (default: `main_file` from the configuration)
    #[arg(long, global = true)]
    main: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log every merge decision
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge one file into the main collection, writing a new file.
    Update {
        /// File with the incoming entries
        #[arg(long)]
        new: PathBuf,
        /// Output file (default: `<main>_updated.bib` next to the main file)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Merge every .bib file under a directory into the main collection, in place.
    Sync {
        /// Directory searched recursively (default: `source_dir`)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Do not write `<main>.bak` first
        #[arg(long)]
        no_backup: bool,
        /// Duplicate passes to run after merging
        #[arg(long, value_enum)]
        dedupe: Option<Passes>,
    },

    /// Remove duplicates from the main collection.
    Dedupe {
        /// Output file (default: rewrite the main file)
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Passes::Both)]
        by: Passes,
    },

    /// List entries of another file whose titles are not in the main collection.
    Missing {
        #[arg(long)]
        other: PathBuf,
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Look up an entry of the main collection by title.
    FindTitle { title: String },

    /// Translate citation keys used in source files to the main collection's keys.
    RemapKeys {
        /// Directory searched recursively (default: `source_dir`)
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Show how a file parses and, with --main, what merging it would do.
    Inspect {
        #[arg(long)]
        file: PathBuf,
        key: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Passes {
    None,
    Title,
    Identifier,
    Both,
}

impl From<Passes> for DedupePasses {
    fn from(passes: Passes) -> Self {
        match passes {
            Passes::None => DedupePasses::None,
            Passes::Title => DedupePasses::Title,
            Passes::Identifier => DedupePasses::Identifier,
            Passes::Both => DedupePasses::Both,
        }
    }
}

fn main() -> CliResult {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = SyncConfig::load(cli.config.as_deref())?;
    let explicit_main = cli.main.clone();
    if let Some(main) = cli.main {
        config.main_file = main;
    }
    let json = cli.json;

    match cli.command {
        Commands::Update { new, out } => cmd_update(&config, &new, out, json),
        Commands::Sync {
            dir,
            no_backup,
            dedupe,
        } => {
            if let Some(dir) = dir {
                config.source_dir = Some(dir);
            }
            if no_backup {
                config.backup = false;
            }
            if let Some(passes) = dedupe {
                config.dedupe = passes.into();
            }
            cmd_sync(&config, json)
        }
        Commands::Dedupe { out, by } => cmd_dedupe(&config, out, by.into(), json),
        Commands::Missing { other, limit } => cmd_missing(&config, &other, limit, json),
        Commands::FindTitle { title } => cmd_find_title(&config, &title, json),
        Commands::RemapKeys { dir, keys } => {
            if let Some(dir) = dir {
                config.source_dir = Some(dir);
            }
            cmd_remap_keys(&config, &keys, json)
        }
        Commands::Inspect { file, key } => cmd_inspect(&file, &key, explicit_main.as_deref(), json),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// === Commands ===

fn cmd_update(config: &SyncConfig, new: &Path, out: Option<PathBuf>, json: bool) -> CliResult {
    let out = out.unwrap_or_else(|| updated_path(&config.main_file));
    let summary = library::update(&config.main_file, new, &out, &config.output.write_options())?;

    if json {
        return print_json(&summary);
    }
    println!("Original entries: {}", summary.original_entries);
    print_merge(&summary.merge);
    println!("Total entries: {}", summary.total_entries);
    println!("Written to {}", out.display());
    Ok(())
}

fn cmd_sync(config: &SyncConfig, json: bool) -> CliResult {
    let summary = library::sync(config)?;

    if json {
        return print_json(&summary);
    }
    println!("Initial entries: {}", summary.initial_entries);
    println!("Files processed: {}", summary.files_processed);
    print_merge(&summary.merge);
    if summary.dedupe.removed() > 0 {
        println!(
            "Duplicates removed: {} by title, {} by key",
            summary.dedupe.by_title, summary.dedupe.by_identifier
        );
    }
    println!("Final entries: {}", summary.final_entries);
    if let Some(backup) = &summary.backup {
        println!("Backup: {}", backup.display());
    }
    if !summary.failures.is_empty() {
        println!("Failed files:");
        for failure in &summary.failures {
            println!("  {}: {}", failure.path.display(), failure.error);
        }
    }
    Ok(())
}

fn cmd_dedupe(config: &SyncConfig, out: Option<PathBuf>, passes: DedupePasses, json: bool) -> CliResult {
    let main = &config.main_file;
    let out = match out {
        Some(out) => out,
        None => {
            if config.backup {
                let backup = library::backup(main)?;
                tracing::info!("backed up {} to {}", main.display(), backup.display());
            }
            main.clone()
        }
    };
    let summary = library::dedupe_file(main, &out, passes, &config.output.write_options())?;

    if json {
        return print_json(&summary);
    }
    println!("Original entries: {}", summary.original_entries);
    println!("Removed by title: {}", summary.report.by_title);
    println!("Removed by key: {}", summary.report.by_identifier);
    println!("Total entries: {}", summary.total_entries);
    Ok(())
}

fn cmd_missing(config: &SyncConfig, other: &Path, limit: usize, json: bool) -> CliResult {
    let main = library::load(&config.main_file)?;
    let other_bib = library::load(other)?;
    let missing = missing_from(&main.entries, &other_bib.entries);

    if json {
        return print_json(&missing);
    }
    if missing.is_empty() {
        println!(
            "Every titled entry of {} is in {}",
            other.display(),
            config.main_file.display()
        );
        return Ok(());
    }
    println!(
        "{} entries of {} are missing from {}:",
        missing.len(),
        other.display(),
        config.main_file.display()
    );
    for entry in missing.iter().take(limit) {
        println!(
            "  {}: {}",
            entry.key.as_deref().unwrap_or("(no key)"),
            entry.title
        );
    }
    if missing.len() > limit {
        println!("  ... and {} more", missing.len() - limit);
    }
    Ok(())
}

fn cmd_find_title(config: &SyncConfig, title: &str, json: bool) -> CliResult {
    let main = library::load(&config.main_file)?;
    let hit = find_by_title(&main.entries, title);

    if json {
        return print_json(&hit);
    }
    match hit {
        Some(entry) => print!("{}", write_entry(entry)),
        None => println!("No entry titled \"{}\" in {}", title, config.main_file.display()),
    }
    Ok(())
}

fn cmd_remap_keys(config: &SyncConfig, keys: &[String], json: bool) -> CliResult {
    let dir = config
        .source_dir
        .as_deref()
        .ok_or("no source directory: pass --dir or set source_dir")?;
    let main = library::load(&config.main_file)?;

    let mut sources: Vec<Vec<BibEntry>> = Vec::new();
    for path in library::discover_sources(dir, &config.main_file, &config.skipped_names())? {
        match library::load(&path) {
            Ok(bib) => sources.push(bib.entries),
            Err(e) => tracing::warn!("skipping {}: {}", path.display(), e),
        }
    }
    let slices: Vec<&[BibEntry]> = sources.iter().map(Vec::as_slice).collect();
    let remaps = remap_keys(&main.entries, &slices, keys);

    if json {
        return print_json(&remaps);
    }
    for remap in &remaps {
        match &remap.outcome {
            RemapOutcome::Resolved(key) => println!("{} -> {}", remap.key, key),
            RemapOutcome::TitleNotInMain(title) => {
                println!("{}: title not in main file ({})", remap.key, title)
            }
            RemapOutcome::NoSource => println!("{}: not defined in any source", remap.key),
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct Inspection<'a> {
    file: &'a Path,
    entries: usize,
    diagnostics: usize,
    key: &'a str,
    entry: Option<BibEntry>,
    dry_run: Option<MergeReport>,
}

fn cmd_inspect(file: &Path, key: &str, main: Option<&Path>, json: bool) -> CliResult {
    let bib = library::load(file)?;
    let dry_run = match main {
        Some(main) => {
            let mut target = library::load(main)?.entries;
            Some(merge_into(&mut target, &bib.entries))
        }
        None => None,
    };
    let inspection = Inspection {
        file,
        entries: bib.entries.len(),
        diagnostics: bib.diagnostics.len(),
        key,
        entry: find_key(&bib.entries, key).cloned(),
        dry_run,
    };

    if json {
        return print_json(&inspection);
    }
    println!(
        "{}: {} entries, {} skipped",
        file.display(),
        inspection.entries,
        inspection.diagnostics
    );
    match &inspection.entry {
        Some(entry) => print!("{}", write_entry(entry)),
        None => println!("Key {} not found", key),
    }
    if let Some(report) = &inspection.dry_run {
        println!("Merging into main would:");
        print_merge(report);
    }
    Ok(())
}

// === Helpers ===

fn print_merge(report: &MergeReport) {
    println!("Added: {}", report.added);
    println!("Replaced with published versions: {}", report.replaced);
    println!("Skipped duplicates: {}", report.skipped);
}

/// `dir/lab.bib` -> `dir/lab_updated.bib`
fn updated_path(main: &Path) -> PathBuf {
    let stem = main
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "references".to_string());
    main.with_file_name(format!("{stem}_updated.bib"))
}
