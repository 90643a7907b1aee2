use crate::error::ReconError;
use crate::model::Field;
use crate::value::format_number;

/// Append-only destination for changed-record lines.
pub trait AuditSink {
    /// Called once, right before the first row is read.
    fn open(&mut self) -> Result<(), ReconError>;

    fn record(&mut self, id: f64, fields: &[Field]) -> Result<(), ReconError>;

    /// Flush and release. Safe to call more than once.
    fn close(&mut self) -> Result<(), ReconError>;
}

/// `100123 unequal: ['FIRST', 'Email']`
pub fn audit_line(id: f64, fields: &[Field]) -> String {
    let names: Vec<String> = fields.iter().map(|f| format!("'{f}'")).collect();
    format!("{} unequal: [{}]", format_number(id), names.join(", "))
}

/// Keeps lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Vec<String>,
    open: bool,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn was_closed(&self) -> bool {
        self.closed
    }
}

impl AuditSink for MemorySink {
    fn open(&mut self) -> Result<(), ReconError> {
        self.open = true;
        Ok(())
    }

    fn record(&mut self, id: f64, fields: &[Field]) -> Result<(), ReconError> {
        if !self.open {
            return Err(ReconError::Audit("sink is not open".into()));
        }
        self.lines.push(audit_line(id, fields));
        Ok(())
    }

    fn close(&mut self) -> Result<(), ReconError> {
        if self.open {
            self.open = false;
            self.closed = true;
        }
        Ok(())
    }
}
