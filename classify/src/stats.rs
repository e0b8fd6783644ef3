use parking_lot::Mutex;
use serde::Serialize;

use crate::catalog::ClassId;
use crate::knn::Decision;

/// Aggregate counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Queries with a known label.
    pub tests: u64,
    pub correct: u64,
    pub no_decisions: u64,
    /// Alignments that produced a distance.
    pub alignments: u64,
    /// Alignments skipped after a recoverable failure.
    pub failed_alignments: u64,
    pub voice_tests: u64,
    pub voice_correct: u64,
    pub group_tests: u64,
    pub group_correct: u64,
}

impl StatsSnapshot {
    /// Fraction of labelled queries classified correctly.
    pub fn accuracy(&self) -> f64 {
        if self.tests == 0 {
            return 0.0;
        }
        self.correct as f64 / self.tests as f64
    }
}

/// Run-wide statistics, updated only through the `record_*` calls.
#[derive(Debug, Default)]
pub struct RunStatistics {
    inner: Mutex<StatsSnapshot>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_alignments(&self, ok: u64, failed: u64) {
        let mut s = self.inner.lock();
        s.alignments += ok;
        s.failed_alignments += failed;
    }

    /// Counts a decision; accuracy only moves when `truth` is known.
    pub fn record_decision(&self, decision: Decision, truth: Option<ClassId>) {
        let mut s = self.inner.lock();
        if decision == Decision::NoDecision {
            s.no_decisions += 1;
        }
        if let Some(truth) = truth {
            s.tests += 1;
            if decision == Decision::Class(truth) {
                s.correct += 1;
            }
        }
    }

    pub fn record_voice(&self, correct: bool) {
        let mut s = self.inner.lock();
        s.voice_tests += 1;
        s.voice_correct += correct as u64;
    }

    pub fn record_group(&self, correct: bool) {
        let mut s = self.inner.lock();
        s.group_tests += 1;
        s.group_correct += correct as u64;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        *self.inner.lock()
    }

    pub fn accuracy(&self) -> f64 {
        self.snapshot().accuracy()
    }

    pub fn reset(&self) {
        *self.inner.lock() = StatsSnapshot::default();
    }
}
