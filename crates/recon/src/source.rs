use std::path::Path;

use crate::error::ReconError;
use crate::model::SourceRow;

/// Lazily produced rows of one export.
pub type SourceRows = Box<dyn Iterator<Item = Result<SourceRow, ReconError>>>;

/// A spreadsheet-like export read one row at a time.
pub trait RecordSource {
    /// File the rows come from; checked before `open` is called.
    fn path(&self) -> &Path;

    /// Start reading. The first physical row is the header row and is not
    /// yielded; every yielded row exposes the full header set.
    fn open(&mut self) -> Result<SourceRows, ReconError>;
}

/// In-memory rows, for tests and callers that already hold the data.
pub struct VecSource {
    path: std::path::PathBuf,
    rows: Option<Vec<SourceRow>>,
    opened: usize,
}

impl VecSource {
    pub fn new(path: impl Into<std::path::PathBuf>, rows: Vec<SourceRow>) -> Self {
        Self {
            path: path.into(),
            rows: Some(rows),
            opened: 0,
        }
    }

    /// How many times `open` was called.
    pub fn times_opened(&self) -> usize {
        self.opened
    }
}

impl RecordSource for VecSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn open(&mut self) -> Result<SourceRows, ReconError> {
        self.opened += 1;
        let rows = self.rows.take().unwrap_or_default();
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}
