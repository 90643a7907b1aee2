use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad threshold, inverted sentinel band, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Source or target file absent, unreadable, or not a regular file.
    #[error("cannot read {path}: {message}")]
    FileAccess { path: String, message: String },
    /// Spreadsheet or CSV content could not be read.
    #[error("source error: {0}")]
    Source(String),
    /// Store connection or query failure.
    #[error("store error: {0}")]
    Store(String),
    /// Audit log could not be opened or written.
    #[error("audit log error: {0}")]
    Audit(String),
}

impl ReconError {
    /// Fault kind shown in the pipeline's exception banner.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) | Self::ConfigValidation(_) => "ConfigFault",
            Self::FileAccess { .. } => "MissingFileFault",
            Self::Source(_) => "SourceFault",
            Self::Store(_) => "StoreConnectivityFault",
            Self::Audit(_) => "AuditFault",
        }
    }

    pub fn file_access(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::FileAccess {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}
