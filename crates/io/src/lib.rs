// File and database collaborators for the reconciliation engine

pub mod audit;
pub mod csv;
pub mod source;
pub mod store;
pub mod xlsx;

pub use audit::FileAuditSink;
pub use source::SpreadsheetSource;
pub use store::SqliteStore;
