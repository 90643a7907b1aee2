//! Staged, fail-fast execution harness.
//!
//! Each stage is a lazy iterator of [`StageEvent`]s. The runner forwards
//! progress text, stops at the first stage failure or fault, and always
//! closes with a pass/fail banner. It never returns an error to its caller;
//! the structured [`Outcome`] is available once the stream is exhausted.

use std::collections::VecDeque;

use serde::Serialize;

use crate::error::ReconError;

pub const SUCCESS_BANNER: &str = "\nSUCCESS!  All processing completed";
pub const FAILED_BANNER: &str = "\nFAILED!  Fix error and re-run";

/// One step of a stage's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Progress(String),
    /// Anticipated failure; the reason is shown to the operator.
    Failure(String),
}

/// `Err` is an unexpected fault.
pub type StageItem = Result<StageEvent, ReconError>;

pub type Stage<'a> = Box<dyn Iterator<Item = StageItem> + 'a>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Fixed-format banner for a fault caught by the runner.
pub fn fault_banner(err: &ReconError) -> String {
    let rule = "-".repeat(64);
    format!("{rule}\nEXCEPTION: {}\n{err}\n{rule}\n", err.kind())
}

enum Phase {
    Running,
    Closing(Outcome),
    Closed,
}

pub struct PipelineRunner<'a> {
    stages: VecDeque<Stage<'a>>,
    phase: Phase,
    outcome: Option<Outcome>,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(stages: Vec<Stage<'a>>) -> Self {
        Self {
            stages: stages.into(),
            phase: Phase::Running,
            outcome: None,
        }
    }

    /// Final status; `None` until the closing banner has been yielded.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Drain every message and return them with the outcome.
    pub fn run_to_end(mut self) -> (Vec<String>, Outcome) {
        let messages: Vec<String> = self.by_ref().collect();
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| Outcome::Failed("pipeline did not finish".into()));
        (messages, outcome)
    }

    fn abort(&mut self, reason: String) {
        // Dropping the remaining stages releases whatever they hold
        self.stages.clear();
        self.phase = Phase::Closing(Outcome::Failed(reason));
    }
}

impl Iterator for PipelineRunner<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Running) {
                Phase::Closed => {
                    self.phase = Phase::Closed;
                    return None;
                }
                Phase::Closing(outcome) => {
                    let banner = match &outcome {
                        Outcome::Succeeded => SUCCESS_BANNER,
                        Outcome::Failed(_) => FAILED_BANNER,
                    };
                    log::info!("pipeline finished: {:?}", outcome);
                    self.outcome = Some(outcome);
                    self.phase = Phase::Closed;
                    return Some(banner.to_string());
                }
                Phase::Running => {}
            }

            let Some(stage) = self.stages.front_mut() else {
                self.phase = Phase::Closing(Outcome::Succeeded);
                continue;
            };

            match stage.next() {
                Some(Ok(StageEvent::Progress(msg))) => return Some(msg),
                Some(Ok(StageEvent::Failure(reason))) => {
                    log::warn!("stage failed: {reason}");
                    let msg = format!(" - {reason}\n");
                    self.abort(reason);
                    return Some(msg);
                }
                Some(Err(fault)) => {
                    log::error!("unexpected fault: {fault}");
                    let banner = fault_banner(&fault);
                    self.abort(fault.to_string());
                    return Some(banner);
                }
                None => {
                    self.stages.pop_front();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn progress(msgs: &[&str]) -> Stage<'static> {
        let items: Vec<StageItem> = msgs
            .iter()
            .map(|m| Ok(StageEvent::Progress(m.to_string())))
            .collect();
        Box::new(items.into_iter())
    }

    #[test]
    fn all_stages_succeed() {
        let runner = PipelineRunner::new(vec![progress(&["a", "b"]), progress(&["c"])]);
        let (messages, outcome) = runner.run_to_end();
        assert_eq!(messages, vec!["a", "b", "c", SUCCESS_BANNER]);
        assert_eq!(outcome, Outcome::Succeeded);
    }

    #[test]
    fn empty_pipeline_succeeds() {
        let (messages, outcome) = PipelineRunner::new(vec![]).run_to_end();
        assert_eq!(messages, vec![SUCCESS_BANNER]);
        assert!(outcome.is_success());
    }

    #[test]
    fn failure_skips_remaining_stages() {
        let polled = Rc::new(Cell::new(0));
        let counter = Rc::clone(&polled);
        let later: Stage<'static> = Box::new(std::iter::from_fn(move || {
            counter.set(counter.get() + 1);
            None
        }));
        let failing: Stage<'static> = Box::new(
            vec![
                Ok(StageEvent::Progress("checking".into())),
                Ok(StageEvent::Failure("Error: File not found: x.db".into())),
                Ok(StageEvent::Progress("never shown".into())),
            ]
            .into_iter(),
        );

        let (messages, outcome) = PipelineRunner::new(vec![failing, later]).run_to_end();
        assert_eq!(
            messages,
            vec!["checking", " - Error: File not found: x.db\n", FAILED_BANNER]
        );
        assert_eq!(outcome, Outcome::Failed("Error: File not found: x.db".into()));
        assert_eq!(polled.get(), 0);
    }

    #[test]
    fn fault_is_rendered_once_and_fails_run() {
        let faulty: Stage<'static> = Box::new(
            vec![
                Ok(StageEvent::Progress("row 1".into())),
                Err(ReconError::Store("connection reset".into())),
                Err(ReconError::Store("second fault".into())),
            ]
            .into_iter(),
        );
        let (messages, outcome) =
            PipelineRunner::new(vec![faulty, progress(&["after"])]).run_to_end();

        assert_eq!(messages.len(), 3);
        let banners: Vec<&String> = messages.iter().filter(|m| m.contains("EXCEPTION")).collect();
        assert_eq!(banners.len(), 1);
        assert!(banners[0].contains("StoreConnectivityFault"));
        assert!(banners[0].contains("connection reset"));
        assert_eq!(messages.last().map(String::as_str), Some(FAILED_BANNER));
        assert!(!outcome.is_success());
    }

    #[test]
    fn banner_format() {
        let banner = fault_banner(&ReconError::Source("bad sheet".into()));
        let lines: Vec<&str> = banner.lines().collect();
        assert_eq!(lines[0], "-".repeat(64));
        assert_eq!(lines[1], "EXCEPTION: SourceFault");
        assert_eq!(lines[2], "source error: bad sheet");
        assert_eq!(lines[3], "-".repeat(64));
    }

    #[test]
    fn runner_is_lazy_and_stays_closed() {
        let polled = Rc::new(Cell::new(0));
        let counter = Rc::clone(&polled);
        let stage: Stage<'static> = Box::new(std::iter::from_fn(move || {
            counter.set(counter.get() + 1);
            (counter.get() <= 2).then(|| Ok(StageEvent::Progress("tick".into())))
        }));
        let mut runner = PipelineRunner::new(vec![stage]);
        assert_eq!(polled.get(), 0);
        assert_eq!(runner.next().as_deref(), Some("tick"));
        assert_eq!(polled.get(), 1);
        assert!(runner.outcome().is_none());
        assert_eq!(runner.by_ref().count(), 2);
        assert_eq!(runner.outcome(), Some(&Outcome::Succeeded));
        assert_eq!(runner.next(), None);
    }
}
