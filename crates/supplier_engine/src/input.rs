use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input directory {0:?} does not exist or is not a directory")]
    MissingDir(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// A source file of postcodes, identified by its file name for resumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub path: PathBuf,
}

/// Lists `*.csv` files directly inside `dir`, sorted by name.
pub fn list_input_files(dir: &Path) -> Result<Vec<InputFile>, InputError> {
    if !dir.is_dir() {
        return Err(InputError::MissingDir(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            files.push(InputFile {
                name: name.to_string(),
                path: path.clone(),
            });
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Reads the postcode column (first field) of a header-less CSV file.
///
/// Quotes and surrounding whitespace are stripped; blank values are dropped.
pub fn read_postcodes(path: &Path) -> Result<Vec<String>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut postcodes = Vec::new();
    for row in reader.records() {
        let row = row?;
        let Some(field) = row.get(0) else {
            continue;
        };
        let postcode = field.trim().trim_matches('"').trim();
        if !postcode.is_empty() {
            postcodes.push(postcode.to_string());
        }
    }
    Ok(postcodes)
}
