use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::ClusterError;

/// Identifies one search in a [`SearchRegistry`].
pub type Token = u64;

/// Progress of one search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchState {
    /// Candidates evaluated so far.
    pub tries: u32,
    /// GVF the next candidate must reach.
    pub threshold: f64,
    /// How often the threshold was lowered.
    pub relaxations: u32,
    /// Cluster count of the next candidate.
    pub k: usize,
    pub accepted: bool,
}

/// Outcome of recording one evaluated candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Step {
    Accept { threshold: f64 },
    Retry { k: usize },
}

/// Cluster-count bounds of one search.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bounds {
    /// A rejected candidate at or below this count triggers a relaxation.
    pub floor: usize,
    /// Count the search restarts from after a relaxation.
    pub restart: usize,
}

/// Relaxation state of every search, shared across worker threads.
///
/// All reads and writes go through one lock, held only for the
/// read-modify-write of a single state, never while a candidate is
/// evaluated.
#[derive(Debug, Default)]
pub struct SearchRegistry {
    states: Mutex<HashMap<Token, SearchState>>,
}

impl SearchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a search. Fails if `token` names a search that has not
    /// accepted yet; a finished token may be reused.
    pub(crate) fn begin(&self, token: Token, threshold: f64, k: usize) -> Result<(), ClusterError> {
        let mut states = self.states.lock();
        if let Some(state) = states.get(&token) {
            if !state.accepted {
                return Err(ClusterError::Busy { token });
            }
        }
        states.insert(
            token,
            SearchState {
                tries: 0,
                threshold,
                relaxations: 0,
                k,
                accepted: false,
            },
        );
        Ok(())
    }

    /// Applies the verdict for a candidate with the given GVF.
    ///
    /// Rejection steps the cluster count down; at the floor the count
    /// restarts and the threshold decays to `1 - ln(tries) / log2(100)`.
    /// A threshold at or below `reset_threshold` snaps back to
    /// `initial_threshold`, and past `relaxation_limit` relaxations it is
    /// forced to 0 so the next candidate is accepted.
    pub(crate) fn record(&self, token: Token, gvf: f64, bounds: Bounds, cfg: &SearchConfig) -> Step {
        let mut states = self.states.lock();
        let state = states.entry(token).or_insert(SearchState {
            tries: 0,
            threshold: cfg.initial_threshold,
            relaxations: 0,
            k: bounds.restart,
            accepted: false,
        });

        state.tries += 1;
        if gvf >= state.threshold {
            state.accepted = true;
            return Step::Accept {
                threshold: state.threshold,
            };
        }

        if state.k <= bounds.floor {
            state.k = bounds.restart;
            state.threshold = 1.0 - (state.tries as f64).ln() / 100f64.log2();
            state.relaxations += 1;
            debug!(
                token,
                tries = state.tries,
                threshold = state.threshold,
                relaxations = state.relaxations,
                "relaxing gvf threshold"
            );
        } else {
            state.k -= 1;
        }

        if state.threshold <= cfg.reset_threshold {
            state.threshold = cfg.initial_threshold;
        }
        if state.relaxations > cfg.relaxation_limit {
            state.threshold = 0.0;
        }
        Step::Retry { k: state.k }
    }

    /// Drops the state of a search that failed.
    #[cfg(test)]
    pub(crate) fn abandon(&self, token: Token) {
        self.states.lock().remove(&token);
    }

    /// Returns a copy of the state of `token`.
    pub fn snapshot(&self, token: Token) -> Option<SearchState> {
        self.states.lock().get(&token).copied()
    }

    /// Number of searches that have not accepted yet.
    pub fn running(&self) -> usize {
        self.states.lock().values().filter(|s| !s.accepted).count()
    }
}

/// Periodic progress reporter bound to one search.
///
/// The reporter thread wakes every `interval` and logs the search's
/// registry state. [`Watchdog::cancel`] (or dropping the guard) stops it.
#[derive(Debug)]
pub struct Watchdog {
    token: Token,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Starts a reporter for `token`.
    ///
    /// Failure to spawn the thread is logged and leaves the search without
    /// progress reports.
    pub fn spawn(token: Token, registry: Arc<SearchRegistry>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<()>();
        let spawned = thread::Builder::new()
            .name(format!("jenks-watchdog-{token}"))
            .spawn(move || loop {
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(s) = registry.snapshot(token) {
                            info!(
                                token,
                                tries = s.tries,
                                threshold = s.threshold,
                                relaxations = s.relaxations,
                                k = s.k,
                                "clustering still running"
                            );
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        let handle = match spawned {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(token, error = %e, "failed to start clustering watchdog");
                None
            }
        };
        Self {
            token,
            stop: Some(tx),
            handle,
        }
    }

    /// Stops the reporter and waits for its thread. Later calls do nothing.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(token = self.token, "clustering watchdog panicked");
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.is_none()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds {
            floor: 2,
            restart: 3,
        }
    }

    #[test]
    fn accepts_at_threshold() {
        let reg = SearchRegistry::new();
        let cfg = SearchConfig::default();
        reg.begin(1, cfg.initial_threshold, 4).unwrap();

        assert_eq!(reg.record(1, 0.8, bounds(), &cfg), Step::Accept { threshold: 0.8 });
        let s = reg.snapshot(1).unwrap();
        assert!(s.accepted);
        assert_eq!(s.tries, 1);
        assert_eq!(reg.running(), 0);
    }

    #[test]
    fn rejection_steps_down_then_relaxes() {
        let reg = SearchRegistry::new();
        let cfg = SearchConfig::default();
        reg.begin(1, cfg.initial_threshold, 3).unwrap();

        assert_eq!(reg.record(1, 0.1, bounds(), &cfg), Step::Retry { k: 2 });
        assert_eq!(reg.snapshot(1).unwrap().relaxations, 0);

        // k is at the floor: restart and decay the threshold.
        assert_eq!(reg.record(1, 0.1, bounds(), &cfg), Step::Retry { k: 3 });
        let s = reg.snapshot(1).unwrap();
        assert_eq!(s.relaxations, 1);
        let expected = 1.0 - 2f64.ln() / 100f64.log2();
        assert!((s.threshold - expected).abs() < 1e-12, "threshold {}", s.threshold);
    }

    #[test]
    fn low_threshold_resets_to_initial() {
        let reg = SearchRegistry::new();
        let cfg = SearchConfig::default();
        reg.begin(9, cfg.initial_threshold, 2).unwrap();
        let tight = Bounds {
            floor: 2,
            restart: 2,
        };

        // ln(t) / log2(100) >= 0.75 first holds at t = 146.
        let mut min_seen = f64::MAX;
        for _ in 0..200 {
            reg.record(9, 0.0, tight, &cfg);
            let s = reg.snapshot(9).unwrap();
            assert!(s.threshold > cfg.reset_threshold, "threshold {} not reset", s.threshold);
            min_seen = min_seen.min(s.threshold);
        }
        assert!(min_seen < 0.3, "threshold never decayed: {min_seen}");
    }

    #[test]
    fn relaxation_limit_forces_acceptance() {
        let reg = SearchRegistry::new();
        let cfg = SearchConfig {
            relaxation_limit: 3,
            ..Default::default()
        };
        let tight = Bounds {
            floor: 1,
            restart: 1,
        };
        reg.begin(5, cfg.initial_threshold, 1).unwrap();
        for _ in 0..4 {
            assert!(matches!(reg.record(5, 0.0, tight, &cfg), Step::Retry { .. }));
        }
        assert_eq!(reg.snapshot(5).unwrap().threshold, 0.0);
        assert_eq!(reg.record(5, 0.0, tight, &cfg), Step::Accept { threshold: 0.0 });
    }

    #[test]
    fn running_token_is_busy() {
        let reg = SearchRegistry::new();
        reg.begin(3, 0.8, 4).unwrap();
        assert!(matches!(reg.begin(3, 0.8, 4), Err(ClusterError::Busy { token: 3 })));
        reg.abandon(3);
        reg.begin(3, 0.8, 4).unwrap();
    }

    #[test]
    fn watchdog_reports_and_cancels_once() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let reg = Arc::new(SearchRegistry::new());
        reg.begin(11, 0.8, 4).unwrap();

        let mut dog = Watchdog::spawn(11, Arc::clone(&reg), Duration::from_millis(5));
        thread::sleep(Duration::from_millis(30));
        assert!(!dog.is_cancelled());
        dog.cancel();
        assert!(dog.is_cancelled());
        dog.cancel();
    }
}
