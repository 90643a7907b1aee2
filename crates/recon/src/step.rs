//! Pipeline stages for the member update run.

use std::path::{Path, PathBuf};

use crate::audit::AuditSink;
use crate::config::SyncConfig;
use crate::error::ReconError;
use crate::fs_check::check_regular_file;
use crate::model::{CanonicalRecord, RunCounters, SourceRow};
use crate::normalize::RecordNormalizer;
use crate::policy::FieldEqualityPolicy;
use crate::pipeline::{StageEvent, StageItem};
use crate::source::{RecordSource, SourceRows};
use crate::store::KeyedStore;
use crate::value::group_thousands;

// ---------------------------------------------------------------------------
// Store file check
// ---------------------------------------------------------------------------

/// Announces the target database and verifies it is a regular file.
pub struct StoreFileCheck {
    path: PathBuf,
    announced: bool,
    done: bool,
}

impl StoreFileCheck {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            announced: false,
            done: false,
        }
    }
}

impl Iterator for StoreFileCheck {
    type Item = StageItem;

    fn next(&mut self) -> Option<StageItem> {
        if self.done {
            return None;
        }
        if !self.announced {
            self.announced = true;
            return Some(Ok(StageEvent::Progress(format!(
                "Updating membership database:\n - File: {}\n",
                self.path.display()
            ))));
        }
        self.done = true;
        check_regular_file(&self.path)
            .err()
            .map(|e| Ok(StageEvent::Failure(e.to_string())))
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

enum StepState {
    Announce,
    CheckSource,
    Open,
    Streaming,
    Finished,
}

/// Streams the export, compares each member against the store, and logs
/// changed members to the audit sink.
pub struct ReconciliationStep<S, K, A> {
    source: S,
    store: K,
    sink: A,
    normalizer: RecordNormalizer,
    policy: FieldEqualityPolicy,
    min_member_id: f64,
    progress_every: usize,
    state: StepState,
    rows: Option<SourceRows>,
    sink_open: bool,
    counters: RunCounters,
    pending: Vec<CanonicalRecord>,
}

impl<S, K, A> ReconciliationStep<S, K, A>
where
    S: RecordSource,
    K: KeyedStore,
    A: AuditSink,
{
    pub fn new(source: S, store: K, sink: A, config: &SyncConfig) -> Self {
        Self {
            source,
            store,
            sink,
            normalizer: RecordNormalizer::from_config(config),
            policy: FieldEqualityPolicy::from_config(&config.policy),
            min_member_id: config.min_member_id,
            progress_every: config.progress_every.max(1),
            state: StepState::Announce,
            rows: None,
            sink_open: false,
            counters: RunCounters::default(),
            pending: Vec::new(),
        }
    }

    pub fn counters(&self) -> RunCounters {
        RunCounters {
            additions: self.pending.len(),
            ..self.counters
        }
    }

    /// New members found so far; not persisted.
    pub fn pending_insertions(&self) -> &[CanonicalRecord] {
        &self.pending
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    pub fn source_path(&self) -> &Path {
        self.source.path()
    }

    fn open(&mut self) -> Result<(), ReconError> {
        log::debug!("opening source {}", self.source.path().display());
        let rows = self.source.open()?;
        self.sink.open()?;
        self.sink_open = true;
        self.rows = Some(rows);
        Ok(())
    }

    fn process(&mut self, row: SourceRow) -> Result<(), ReconError> {
        self.counters.rows_read += 1;

        let record = self.normalizer.normalize(&row);
        let id = match record.id {
            Some(id) if id >= self.min_member_id => id,
            _ => return Ok(()),
        };

        match self.store.lookup_by_id(id)? {
            None => self.pending.push(record),
            Some(stored) => {
                let unequal = self.policy.unequal_fields(&stored, &record);
                if !unequal.is_empty() {
                    self.counters.updates += 1;
                    self.sink.record(id, &unequal)?;
                }
            }
        }
        Ok(())
    }

    fn release_sink(&mut self) -> Result<(), ReconError> {
        self.rows = None;
        if self.sink_open {
            self.sink_open = false;
            self.sink.close()?;
        }
        Ok(())
    }

    /// End the step on a fault; the sink is released first.
    fn fault(&mut self, err: ReconError) -> Option<StageItem> {
        self.state = StepState::Finished;
        if let Err(close_err) = self.release_sink() {
            log::warn!("audit log not closed cleanly: {close_err}");
        }
        Some(Err(err))
    }

    fn progress_message(&self) -> String {
        let c = self.counters();
        format!(
            "   ... {} read; {} changes; {} additions\n",
            group_thousands(c.rows_read),
            group_thousands(c.updates),
            c.additions
        )
    }

    fn finished_message(&self) -> String {
        let c = self.counters();
        format!(
            "   Finished: {} read; {} changes; {} additions\n",
            c.rows_read,
            group_thousands(c.updates),
            c.additions
        )
    }
}

impl<S, K, A> Iterator for ReconciliationStep<S, K, A>
where
    S: RecordSource,
    K: KeyedStore,
    A: AuditSink,
{
    type Item = StageItem;

    fn next(&mut self) -> Option<StageItem> {
        loop {
            match self.state {
                StepState::Finished => return None,
                StepState::Announce => {
                    self.state = StepState::CheckSource;
                    return Some(Ok(StageEvent::Progress(format!(
                        "Reading from \"All Members\" report:\n - File: {}\n",
                        self.source.path().display()
                    ))));
                }
                StepState::CheckSource => {
                    if let Err(e) = check_regular_file(self.source.path()) {
                        self.state = StepState::Finished;
                        return Some(Ok(StageEvent::Failure(e.to_string())));
                    }
                    self.state = StepState::Open;
                }
                StepState::Open => {
                    if let Err(e) = self.open() {
                        return self.fault(e);
                    }
                    log::info!("reconciling {}", self.source.path().display());
                    self.state = StepState::Streaming;
                }
                StepState::Streaming => {
                    let next_row = match self.rows.as_mut() {
                        Some(rows) => rows.next(),
                        None => None,
                    };
                    match next_row {
                        None => {
                            self.state = StepState::Finished;
                            if let Err(e) = self.release_sink() {
                                return Some(Err(e));
                            }
                            let c = self.counters();
                            log::info!(
                                "finished: {} read, {} changes, {} additions",
                                c.rows_read,
                                c.updates,
                                c.additions
                            );
                            return Some(Ok(StageEvent::Progress(self.finished_message())));
                        }
                        Some(Err(e)) => return self.fault(e),
                        Some(Ok(row)) => {
                            if let Err(e) = self.process(row) {
                                return self.fault(e);
                            }
                            if self.counters.rows_read % self.progress_every == 0 {
                                return Some(Ok(StageEvent::Progress(self.progress_message())));
                            }
                        }
                    }
                }
            }
        }
    }
}
