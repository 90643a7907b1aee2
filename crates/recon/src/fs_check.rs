use std::path::Path;

use thiserror::Error;

/// Why a path is not a usable input file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileCheckError {
    #[error("Error: File not specified")]
    NotSpecified,
    #[error("Error: File not found: {0}")]
    NotFound(String),
    #[error("Error: Must be a file: {0}")]
    NotAFile(String),
}

pub fn check_regular_file(path: &Path) -> Result<(), FileCheckError> {
    if path.as_os_str().is_empty() {
        return Err(FileCheckError::NotSpecified);
    }
    let shown = path.display().to_string();
    match std::fs::metadata(path) {
        Err(_) => Err(FileCheckError::NotFound(shown)),
        Ok(meta) if !meta.is_file() => Err(FileCheckError::NotAFile(shown)),
        Ok(_) => Ok(()),
    }
}
