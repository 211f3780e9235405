//! Deterministic `SolverDriver` test double. Callers queue up the outcomes
//! they want returned, in order, and can inspect what was asked of the
//! driver afterward — the same shape as the fakes `torq`'s relay tests use
//! in place of a live transport.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use uuid::Uuid;

use crate::driver::{SolverDriver, SolverOutcome};
use crate::error::SolverError;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model_file: PathBuf,
    pub data_text: String,
    pub work_id: Uuid,
}

enum Responses {
    /// Pop one response per call; once drained, fall back to Infeasible.
    Queue(Mutex<VecDeque<Result<SolverOutcome, SolverError>>>),
    /// Return a clone of the same outcome on every call.
    Sticky(SolverOutcome),
}

pub struct FakeSolverDriver {
    responses: Responses,
    calls: Mutex<Vec<RecordedCall>>,
    deltmp: AtomicBool,
    dump_glpsol: AtomicBool,
}

impl FakeSolverDriver {
    pub fn new(responses: impl IntoIterator<Item = Result<SolverOutcome, SolverError>>) -> Self {
        Self {
            responses: Responses::Queue(Mutex::new(responses.into_iter().collect())),
            calls: Mutex::new(Vec::new()),
            deltmp: AtomicBool::new(true),
            dump_glpsol: AtomicBool::new(false),
        }
    }

    pub fn always(outcome: SolverOutcome) -> Self {
        Self {
            responses: Responses::Sticky(outcome),
            calls: Mutex::new(Vec::new()),
            deltmp: AtomicBool::new(true),
            dump_glpsol: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl SolverDriver for FakeSolverDriver {
    fn solve(
        &self,
        model_file: &Path,
        data_text: &str,
        _tmp_dir: &Path,
        work_id: Uuid,
    ) -> Result<SolverOutcome, SolverError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model_file: model_file.to_path_buf(),
            data_text: data_text.to_string(),
            work_id,
        });

        match &self.responses {
            Responses::Sticky(outcome) => Ok(outcome.clone()),
            Responses::Queue(queue) => queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(SolverOutcome::Infeasible)),
        }
    }

    fn set_deltmp(&self, enabled: bool) {
        self.deltmp.store(enabled, Ordering::Relaxed);
    }

    fn deltmp(&self) -> bool {
        self.deltmp.load(Ordering::Relaxed)
    }

    fn set_dump_glpsol(&self, enabled: bool) {
        self.dump_glpsol.store(enabled, Ordering::Relaxed);
    }

    fn dump_glpsol(&self) -> bool {
        self.dump_glpsol.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn returns_queued_responses_in_order() {
        let driver = FakeSolverDriver::new([
            Ok(SolverOutcome::Infeasible),
            Ok(SolverOutcome::Unbounded),
        ]);
        let first = driver
            .solve(Path::new("a.model"), "", Path::new("/tmp"), Uuid::nil())
            .unwrap();
        let second = driver
            .solve(Path::new("a.model"), "", Path::new("/tmp"), Uuid::nil())
            .unwrap();
        assert_eq!(first, SolverOutcome::Infeasible);
        assert_eq!(second, SolverOutcome::Unbounded);
        assert_eq!(driver.call_count(), 2);
    }

    #[test]
    fn always_repeats_the_same_outcome() {
        let driver = FakeSolverDriver::always(SolverOutcome::Unbounded);
        for _ in 0..3 {
            let outcome = driver
                .solve(Path::new("a.model"), "", Path::new("/tmp"), Uuid::nil())
                .unwrap();
            assert_eq!(outcome, SolverOutcome::Unbounded);
        }
    }

    #[test]
    fn records_model_file_and_work_id_per_call() {
        let driver = FakeSolverDriver::new([Ok(SolverOutcome::Infeasible)]);
        let id = Uuid::nil();
        driver
            .solve(Path::new("foo.model"), "data", Path::new("/tmp"), id)
            .unwrap();
        let calls = driver.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model_file, Path::new("foo.model"));
        assert_eq!(calls[0].work_id, id);
    }
}
