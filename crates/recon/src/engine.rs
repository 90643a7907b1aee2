use std::path::Path;

use serde::Serialize;

use crate::audit::AuditSink;
use crate::model::RunCounters;
use crate::pipeline::{Outcome, PipelineRunner, Stage};
use crate::source::RecordSource;
use crate::step::{ReconciliationStep, StoreFileCheck};
use crate::store::KeyedStore;

/// Build the member update pipeline: check the database file, then
/// reconcile the export against it.
///
/// The step is borrowed so its counters and pending insertions stay
/// readable once the runner is drained.
pub fn run<'a, S, K, A>(
    store_path: &Path,
    step: &'a mut ReconciliationStep<S, K, A>,
) -> PipelineRunner<'a>
where
    S: RecordSource + 'a,
    K: KeyedStore + 'a,
    A: AuditSink + 'a,
{
    log::info!(
        "member update: store {} source {}",
        store_path.display(),
        step.source_path().display()
    );
    let stages: Vec<Stage<'a>> = vec![Box::new(StoreFileCheck::new(store_path)), Box::new(step)];
    PipelineRunner::new(stages)
}

/// Machine-readable result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    #[serde(flatten)]
    pub outcome: Outcome,
    pub counters: RunCounters,
    pub engine_version: String,
    pub run_at: String,
}

impl RunSummary {
    pub fn new(outcome: Outcome, counters: RunCounters) -> Self {
        Self {
            outcome,
            counters,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
