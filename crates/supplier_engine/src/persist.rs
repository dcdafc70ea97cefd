use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use supplier_core::{PostcodeRecord, ProgressState, ResultSet};
use supplier_logging::supplier_debug;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not read {path:?}")]
    Read { path: PathBuf, source: io::Error },
    #[error("corrupt state file {path:?}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically replace the file at `path` by writing a sibling temp file then renaming.
///
/// A crash mid-write leaves the previous contents in place.
pub struct AtomicFileWriter {
    path: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn write(&self, content: &str) -> Result<&Path, PersistError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        ensure_output_dir(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&self.path)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(&self.path)
    }
}

/// Reads a whole JSON file; a missing file yields `T::default()`.
pub fn read_json_or_default<T>(path: &Path) -> Result<T, PersistError>
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(PersistError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&content).map_err(|source| PersistError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Overwrites `path` with the pretty-printed JSON form of `value`.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistError> {
    let content = serde_json::to_string_pretty(value)?;
    AtomicFileWriter::new(path.to_path_buf()).write(&content)?;
    Ok(())
}

/// The progress file: `{ last_file, last_postcode, completed }`.
#[derive(Debug, Clone)]
pub struct ProgressLedger {
    path: PathBuf,
}

impl ProgressLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<ProgressState, PersistError> {
        read_json_or_default(&self.path)
    }

    pub fn save(&self, progress: &ProgressState) -> Result<(), PersistError> {
        write_json_pretty(&self.path, progress)?;
        supplier_debug!(
            "Saved progress {:?} / {:?} to {:?}",
            progress.last_file,
            progress.last_postcode,
            self.path
        );
        Ok(())
    }
}

/// The results file: a JSON array of committed records.
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads stored records; duplicate postcodes keep their first record.
    pub fn load(&self) -> Result<ResultSet, PersistError> {
        let records: Vec<PostcodeRecord> = read_json_or_default(&self.path)?;
        Ok(ResultSet::from_records(records))
    }

    /// Full overwrite with every committed record.
    pub fn save(&self, results: &ResultSet) -> Result<(), PersistError> {
        write_json_pretty(&self.path, results.records())?;
        supplier_debug!("Saved {} results to {:?}", results.len(), self.path);
        Ok(())
    }
}
