use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use membersync_recon::audit::{audit_line, AuditSink};
use membersync_recon::error::ReconError;
use membersync_recon::model::Field;

/// Changed-member log written to a text file, one line per member.
///
/// The file is created (or truncated) on `open`; missing parent directories
/// are created too.
pub struct FileAuditSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    fn audit_err(&self, e: std::io::Error) -> ReconError {
        ReconError::Audit(format!("{}: {e}", self.path.display()))
    }
}

impl AuditSink for FileAuditSink {
    fn open(&mut self) -> Result<(), ReconError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.audit_err(e))?;
        }
        let file = File::create(&self.path).map_err(|e| self.audit_err(e))?;
        self.writer = Some(BufWriter::new(file));
        log::debug!("audit log {}", self.path.display());
        Ok(())
    }

    fn record(&mut self, id: f64, fields: &[Field]) -> Result<(), ReconError> {
        let line = audit_line(id, fields);
        let result = match self.writer.as_mut() {
            Some(writer) => writeln!(writer, "{line}"),
            None => return Err(ReconError::Audit("audit log is not open".into())),
        };
        result.map_err(|e| self.audit_err(e))
    }

    fn close(&mut self) -> Result<(), ReconError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| self.audit_err(e))?;
        }
        Ok(())
    }
}
