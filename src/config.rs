//! Configuration for citylib.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags / environment variables (CITYLIB_BOOKS, CITYLIB_MEMBERS)
//! 2. Config file (.citylib/config.yaml)
//! 3. Defaults (books.txt and members.txt in the working directory)
//!
//! Config file discovery:
//! - Searches current directory and parents for .citylib/config.yaml
//! - Paths in config file are relative to the directory holding .citylib/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::library::CatalogOptions;
use crate::storage::flat_file::{DEFAULT_BOOKS_FILE, DEFAULT_MEMBERS_FILE};
use crate::storage::FlatFileStore;

/// Directory holding the config file
pub const CONFIG_DIR: &str = ".citylib";

/// Config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Books file (relative to the project root)
    pub books: Option<String>,
    /// Members file (relative to the project root)
    pub members: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub strict_returns: Option<bool>,
}

/// Explicit overrides, usually from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub books: Option<PathBuf>,
    pub members: Option<PathBuf>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub books: PathBuf,
    pub members: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub options: CatalogOptions,
}

impl ResolvedConfig {
    /// Record store over the resolved file paths
    pub fn store(&self) -> FlatFileStore {
        FlatFileStore::new(&self.books, &self.members)
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Load configuration, searching for a config file from the working directory
pub fn load(overrides: Overrides) -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    load_from(&cwd, overrides)
}

/// Load configuration, searching for a config file from `start`.
///
/// Without a config file the defaults are plain relative paths, so they
/// follow the process working directory.
pub fn load_from(start: &Path, overrides: Overrides) -> Result<ResolvedConfig> {
    let config_file = find_config_file(start);

    let (books, members, options) = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        // Base directory is the parent of .citylib/
        let base_dir = config_path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));

        let books = config
            .paths
            .books
            .as_deref()
            .map(|p| resolve_path(base_dir, p))
            .unwrap_or_else(|| base_dir.join(DEFAULT_BOOKS_FILE));

        let members = config
            .paths
            .members
            .as_deref()
            .map(|p| resolve_path(base_dir, p))
            .unwrap_or_else(|| base_dir.join(DEFAULT_MEMBERS_FILE));

        let options = CatalogOptions {
            strict_returns: config
                .catalog
                .as_ref()
                .and_then(|c| c.strict_returns)
                .unwrap_or(false),
        };

        (books, members, options)
    } else {
        (
            PathBuf::from(DEFAULT_BOOKS_FILE),
            PathBuf::from(DEFAULT_MEMBERS_FILE),
            CatalogOptions::default(),
        )
    };

    Ok(ResolvedConfig {
        books: overrides.books.unwrap_or(books),
        members: overrides.members.unwrap_or(members),
        config_file,
        options,
    })
}
