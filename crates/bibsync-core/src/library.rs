//! File-level workflows: load, merge, dedupe and write bibliography files

use std::fs;
use std::path::{Path, PathBuf};

use bibsync_bibtex::{parse, write_bibliography, BibEntry, Bibliography, WriteOptions};
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::SyncConfig;
use crate::dedupe::{dedupe, DedupePasses, DedupeReport};
use crate::error::{BibSyncError, Result};
use crate::merge::{merge_into, MergeDecision, MergeReport};

/// Outcome of merging one file into another
#[derive(Debug, Clone, Serialize)]
pub struct UpdateSummary {
    pub original_entries: usize,
    pub merge: MergeReport,
    pub total_entries: usize,
}

/// Outcome of deduplicating one file
#[derive(Debug, Clone, Serialize)]
pub struct DedupeSummary {
    pub original_entries: usize,
    pub report: DedupeReport,
    pub total_entries: usize,
}

/// A source file that could not be merged
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a directory sync
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub initial_entries: usize,
    pub files_processed: usize,
    pub failures: Vec<SourceFailure>,
    pub merge: MergeReport,
    pub dedupe: DedupeReport,
    pub final_entries: usize,
    pub backup: Option<PathBuf>,
}

/// Read and parse a bibliography file
///
/// Invalid UTF-8 is replaced rather than rejected; skipped entries are
/// logged as warnings.
pub fn load(path: &Path) -> Result<Bibliography> {
    let bytes = fs::read(path).map_err(|e| BibSyncError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let bib = parse(&text).map_err(|source| BibSyncError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    for diagnostic in &bib.diagnostics {
        tracing::warn!(
            "{}:{}: {}",
            path.display(),
            diagnostic.line,
            diagnostic.message
        );
    }
    tracing::info!("loaded {} entries from {}", bib.entries.len(), path.display());
    Ok(bib)
}

/// Write a bibliography file
pub fn save(path: &Path, bib: &Bibliography, options: &WriteOptions) -> Result<()> {
    tracing::info!("writing {} entries to {}", bib.entries.len(), path.display());
    fs::write(path, write_bibliography(bib, options)).map_err(|e| BibSyncError::io(path, e))
}

/// Copy `path` to `path.bak`, returning the backup path
pub fn backup(path: &Path) -> Result<PathBuf> {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    let target = PathBuf::from(name);
    fs::copy(path, &target).map_err(|e| BibSyncError::io(path, e))?;
    Ok(target)
}

/// Find every `.bib` file below `root`, sorted
///
/// The main file itself and files whose base name is in `skip_names` are left
/// out.
pub fn discover_sources(root: &Path, main: &Path, skip_names: &[String]) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(BibSyncError::NotADirectory(root.to_path_buf()));
    }
    let main = fs::canonicalize(main).ok();

    let mut sources = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_bib_file(entry.path()) {
            continue;
        }

        let base = entry.file_name().to_string_lossy();
        if skip_names.iter().any(|skip| *skip == base) {
            tracing::debug!("skipping {} by name", entry.path().display());
            continue;
        }
        if main.is_some() && fs::canonicalize(entry.path()).ok() == main {
            continue;
        }
        sources.push(entry.into_path());
    }

    sources.sort();
    Ok(sources)
}

fn is_bib_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bib"))
}

/// Merge `new` into `main` and write the result to `out`
pub fn update(main: &Path, new: &Path, out: &Path, options: &WriteOptions) -> Result<UpdateSummary> {
    let mut collection = load(main)?;
    let incoming = load(new)?;
    let original_entries = collection.entries.len();

    let merge = merge_into(&mut collection.entries, &incoming.entries);
    log_decisions(new, &incoming.entries, &merge);
    save(out, &collection, options)?;

    Ok(UpdateSummary {
        original_entries,
        merge,
        total_entries: collection.entries.len(),
    })
}

/// Deduplicate one file, writing the result to `out`
pub fn dedupe_file(
    path: &Path,
    out: &Path,
    passes: DedupePasses,
    options: &WriteOptions,
) -> Result<DedupeSummary> {
    let mut collection = load(path)?;
    let original_entries = collection.entries.len();

    let (entries, report) = dedupe(std::mem::take(&mut collection.entries), passes);
    collection.entries = entries;
    tracing::info!(
        "removed {} by title and {} by key from {}",
        report.by_title,
        report.by_identifier,
        path.display()
    );
    save(out, &collection, options)?;

    Ok(DedupeSummary {
        original_entries,
        report,
        total_entries: collection.entries.len(),
    })
}

/// Merge every source file under the configured directory into the main file
///
/// A source that fails to load is recorded and skipped. The main file is
/// backed up (when enabled) and rewritten in place.
pub fn sync(config: &SyncConfig) -> Result<SyncSummary> {
    let root = config
        .source_dir
        .as_deref()
        .ok_or_else(|| BibSyncError::Config("no source directory configured".to_string()))?;

    let mut collection = load(&config.main_file)?;
    let initial_entries = collection.entries.len();
    let sources = discover_sources(root, &config.main_file, &config.skipped_names())?;
    tracing::info!("found {} source files under {}", sources.len(), root.display());

    let mut merge = MergeReport::default();
    let mut failures = Vec::new();
    let mut files_processed = 0;
    for source in &sources {
        let incoming = match load(source) {
            Ok(incoming) => incoming,
            Err(e) => {
                tracing::warn!("error processing {}: {}", source.display(), e);
                failures.push(SourceFailure {
                    path: source.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        let report = merge_into(&mut collection.entries, &incoming.entries);
        log_decisions(source, &incoming.entries, &report);
        merge.absorb(&report);
        files_processed += 1;
    }

    let (entries, dedupe_report) = dedupe(std::mem::take(&mut collection.entries), config.dedupe);
    collection.entries = entries;

    let backup_path = if config.backup {
        Some(backup(&config.main_file)?)
    } else {
        None
    };
    save(&config.main_file, &collection, &config.output.write_options())?;

    Ok(SyncSummary {
        initial_entries,
        files_processed,
        failures,
        merge,
        dedupe: dedupe_report,
        final_entries: collection.entries.len(),
        backup: backup_path,
    })
}

fn log_decisions(source: &Path, incoming: &[BibEntry], report: &MergeReport) {
    for (entry, decision) in incoming.iter().zip(&report.decisions) {
        let title = short_title(entry);
        match decision {
            MergeDecision::Added(_) => tracing::debug!("adding new entry {}: {}", entry.key, title),
            MergeDecision::Replaced(_) => {
                tracing::debug!("replacing preprint with published version {}: {}", entry.key, title)
            }
            MergeDecision::Skipped(_) => tracing::debug!("skipping duplicate {}: {}", entry.key, title),
        }
    }
    tracing::info!(
        "{}: added {}, replaced {}, skipped {}",
        source.display(),
        report.added,
        report.replaced,
        report.skipped
    );
}

fn short_title(entry: &BibEntry) -> String {
    entry.title().unwrap_or_default().chars().take(50).collect()
}
