use std::path::{Path, PathBuf};

use membersync_recon::error::ReconError;
use membersync_recon::source::{RecordSource, SourceRows};

/// The "All Members" export, as a workbook sheet or a delimited file.
///
/// Files ending in `.csv`, `.tsv` or `.txt` are read as delimited text;
/// everything else goes through calamine.
#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    path: PathBuf,
    sheet: String,
}

impl SpreadsheetSource {
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet: sheet.into(),
        }
    }

    fn is_delimited(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "csv" | "tsv" | "txt"))
            .unwrap_or(false)
    }
}

impl RecordSource for SpreadsheetSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn open(&mut self) -> Result<SourceRows, ReconError> {
        if self.is_delimited() {
            log::debug!("reading delimited export {}", self.path.display());
            crate::csv::open_rows(&self.path)
        } else {
            log::debug!("reading sheet '{}' of {}", self.sheet, self.path.display());
            crate::xlsx::open_rows(&self.path, &self.sheet)
        }
    }
}
