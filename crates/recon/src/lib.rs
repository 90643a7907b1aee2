//! `membersync-recon`: membership reconciliation engine.
//!
//! Pure engine crate: normalizes exported member rows, compares them with
//! stored records, and drives the fail-fast update pipeline. Spreadsheet,
//! database and file collaborators live behind traits; no CLI or IO
//! format dependencies.

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod fs_check;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod policy;
pub mod source;
pub mod step;
pub mod store;
pub mod value;

pub use audit::{AuditSink, MemorySink};
pub use config::SyncConfig;
pub use engine::{run, RunSummary};
pub use error::ReconError;
pub use model::{CanonicalRecord, Field, RunCounters, SourceRow, StoredRecord};
pub use normalize::RecordNormalizer;
pub use pipeline::{Outcome, PipelineRunner, StageEvent};
pub use policy::FieldEqualityPolicy;
pub use source::{RecordSource, SourceRows, VecSource};
pub use step::ReconciliationStep;
pub use store::{KeyedStore, MemoryStore};
pub use value::CellValue;
