//! Configuration for bibsync
//!
//! Settings live in a TOML file; every key is optional. Lookup order:
//! an explicit path, `./bibsync.toml`, `<config dir>/bibsync/config.toml`,
//! then built-in defaults. A leading `~/` in any path is expanded.

use std::path::{Path, PathBuf};

use bibsync_bibtex::{EntryOrder, WriteOptions};
use serde::Deserialize;

use crate::dedupe::DedupePasses;
use crate::error::{BibSyncError, Result};

const LOCAL_CONFIG: &str = "bibsync.toml";

/// Settings for update, sync and dedupe runs
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// The canonical collection
    pub main_file: PathBuf,
    /// Directory searched recursively for source `.bib` files
    pub source_dir: Option<PathBuf>,
    /// Base names never merged as sources, in addition to the main file's own
    pub skip_file_names: Vec<String>,
    /// Copy the main file to `<main>.bak` before rewriting it
    pub backup: bool,
    /// Self-dedup passes run after a sync
    pub dedupe: DedupePasses,
    pub output: OutputConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            main_file: PathBuf::from("references.bib"),
            source_dir: None,
            skip_file_names: Vec::new(),
            backup: true,
            dedupe: DedupePasses::None,
            output: OutputConfig::default(),
        }
    }
}

/// How collections are written back
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub indent: String,
    pub order: EntryOrder,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let options = WriteOptions::default();
        Self {
            indent: options.indent,
            order: options.order,
        }
    }
}

impl OutputConfig {
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            indent: self.indent.clone(),
            order: self.order,
        }
    }
}

impl SyncConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: SyncConfig =
            toml::from_str(content).map_err(|e| BibSyncError::Config(e.to_string()))?;
        config.main_file = expand_home(&config.main_file);
        config.source_dir = config.source_dir.as_deref().map(expand_home);
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BibSyncError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Load from the first location that exists, or fall back to defaults
    ///
    /// An explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        for candidate in search_paths() {
            if candidate.is_file() {
                tracing::debug!("using configuration {}", candidate.display());
                return Self::from_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    /// Base names excluded from source discovery, the main file's included
    pub fn skipped_names(&self) -> Vec<String> {
        let mut names = self.skip_file_names.clone();
        if let Some(own) = self.main_file.file_name().and_then(|n| n.to_str()) {
            if !names.iter().any(|n| n == own) {
                names.push(own.to_string());
            }
        }
        names
    }
}

fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("bibsync").join("config.toml"));
    }
    paths
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
