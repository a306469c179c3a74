//! Message catalogs on disk
//!
//! A catalog is one language's message tree, stored as `<lang>.json` inside a
//! messages directory. Saving writes a single-generation backup
//! (`<lang>.json.bak`) of the previous file, then replaces the file through a
//! temporary file and an atomic rename, so a failed write leaves both the old
//! file and its backup in place.

pub mod diff;
pub mod keys;
pub mod order;

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

pub use diff::{missing_keys, DiffMode, MissingKeysReport};
pub use keys::{flatten, leaves_array_gap, unflatten, unflatten_with_shape, FlatMap, Leaf, Structure};

/// Suffix appended to a catalog file name for its backup
pub const BACKUP_SUFFIX: &str = ".bak";

const CATALOG_EXTENSION: &str = "json";

/// Errors raised while reading, restoring or writing catalogs
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A leaf sits where a subtree is needed, or the other way round
    #[error("Key conflict at '{path}' while restoring '{key}'")]
    KeyConflict { key: String, path: String },

    /// An array would be restored with a missing element
    #[error("Array '{path}' has no element at index {index}")]
    ArrayGap { path: String, index: usize },

    /// A key segment contains the path separator and cannot be flattened reversibly
    #[error("Key segment '{segment}' of '{key}' contains the '.' separator")]
    SeparatorInKey { key: String, segment: String },

    /// The catalog root is not a JSON object
    #[error("Catalog root must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// Messages directory does not exist
    #[error("Messages directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// Catalog file does not exist
    #[error("Catalog not found: {0}")]
    NotFound(PathBuf),

    /// Catalog file could not be read
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    /// Catalog or backup file could not be written
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    /// Catalog file is not valid JSON
    #[error("Invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One language's message tree
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Language code, e.g. `en` or `pt-BR`
    pub language: String,

    /// Location of the catalog file
    pub path: PathBuf,

    /// Message tree
    pub data: Value,

    /// Whether the file existed when the catalog was loaded
    pub existed: bool,
}

impl Catalog {
    /// Empty in-memory catalog for a language without a file yet
    pub fn empty(language: &str, path: PathBuf) -> Self {
        Self {
            language: language.to_string(),
            path,
            data: Value::Object(Map::new()),
            existed: false,
        }
    }

    /// Detected layout of this catalog
    pub fn structure(&self) -> Structure {
        keys::detect_structure(&self.data)
    }

    /// Flatten this catalog
    pub fn flatten(&self, structure: Structure) -> Result<FlatMap, CatalogError> {
        keys::flatten(&self.data, structure)
    }
}

/// Messages directory holding one catalog file per language
#[derive(Debug, Clone)]
pub struct CatalogStore {
    dir: PathBuf,
}

impl CatalogStore {
    /// Open a messages directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(CatalogError::DirectoryNotFound(dir));
        }
        Ok(Self { dir })
    }

    /// Messages directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Catalog file path for a language
    pub fn path_for(&self, language: &str) -> PathBuf {
        self.dir.join(format!("{language}.{CATALOG_EXTENSION}"))
    }

    /// Backup file path for a catalog file
    pub fn backup_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    /// Load an existing catalog
    pub fn load(&self, language: &str) -> Result<Catalog, CatalogError> {
        let path = self.path_for(language);
        if !path.exists() {
            return Err(CatalogError::NotFound(path));
        }

        let file = File::open(&path).map_err(|source| CatalogError::Read {
            path: path.clone(),
            source,
        })?;
        let data: Value = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            CatalogError::InvalidJson {
                path: path.clone(),
                source,
            }
        })?;

        tracing::debug!(language, path = %path.display(), "Catalog loaded");
        Ok(Catalog {
            language: language.to_string(),
            path,
            data,
            existed: true,
        })
    }

    /// Load a catalog, or start an empty one in memory if its file is missing
    pub fn load_or_empty(&self, language: &str) -> Result<Catalog, CatalogError> {
        match self.load(language) {
            Err(CatalogError::NotFound(path)) => {
                tracing::info!(language, path = %path.display(), "Target catalog missing, starting empty");
                Ok(Catalog::empty(language, path))
            }
            other => other,
        }
    }

    /// Persist a catalog, returning the backup path if one was written.
    ///
    /// The previous file is copied to its backup before being replaced.
    pub fn save(&self, catalog: &Catalog, backup: bool) -> Result<Option<PathBuf>, CatalogError> {
        let path = &catalog.path;
        let mut content =
            serde_json::to_string_pretty(&catalog.data).map_err(|source| CatalogError::InvalidJson {
                path: path.clone(),
                source,
            })?;
        content.push('\n');

        let backup_path = if backup && path.exists() {
            let backup_path = Self::backup_path(path);
            fs::copy(path, &backup_path).map_err(|source| CatalogError::Write {
                path: backup_path.clone(),
                source,
            })?;
            Some(backup_path)
        } else {
            None
        };

        // Write to temp file first, then rename (atomic)
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let write_result = File::create(&temp_path)
            .and_then(|mut file| {
                file.write_all(content.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp_path, path));

        if let Err(source) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(CatalogError::Write {
                path: path.clone(),
                source,
            });
        }

        tracing::debug!(
            language = %catalog.language,
            path = %path.display(),
            backup = ?backup_path,
            "Catalog saved"
        );
        Ok(backup_path)
    }

    /// Language codes of all catalogs in the directory, sorted, minus `exclude`
    pub fn discover_languages(&self, exclude: &[&str]) -> Result<Vec<String>, CatalogError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| CatalogError::Read {
            path: self.dir.clone(),
            source,
        })?;

        let mut languages: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|ext| ext == CATALOG_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .filter(|code| !exclude.contains(&code.as_str()))
            .collect();

        languages.sort();
        Ok(languages)
    }
}
