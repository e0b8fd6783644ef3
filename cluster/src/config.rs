use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Controls the natural-breaks search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// GVF a candidate must reach before any relaxation (default: 0.8).
    pub initial_threshold: f64,

    /// A relaxed threshold at or below this value snaps back to
    /// `initial_threshold` (default: 0.25).
    pub reset_threshold: f64,

    /// After this many relaxations any GVF is accepted (default: 1000).
    pub relaxation_limit: u32,

    /// Period of the watchdog's progress report in milliseconds
    /// (default: 300000, five minutes).
    pub watchdog_interval_ms: u64,

    /// Seeds the breakpoint offset generator; `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            initial_threshold: 0.8,
            reset_threshold: 0.25,
            relaxation_limit: 1000,
            watchdog_interval_ms: 5 * 60 * 1000,
            seed: None,
        }
    }
}

impl SearchConfig {
    /// Parses a config from JSON bytes. Missing fields take their defaults.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Parses a config from YAML bytes. Missing fields take their defaults.
    pub fn from_yaml(data: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(data)
    }

    pub(crate) fn with_defaults(mut self) -> Self {
        let def = Self::default();
        if self.initial_threshold <= 0.0 || self.initial_threshold > 1.0 {
            self.initial_threshold = def.initial_threshold;
        }
        if self.reset_threshold <= 0.0 || self.reset_threshold >= self.initial_threshold {
            self.reset_threshold = def.reset_threshold.min(self.initial_threshold / 2.0);
        }
        if self.relaxation_limit == 0 {
            self.relaxation_limit = def.relaxation_limit;
        }
        if self.watchdog_interval_ms == 0 {
            self.watchdog_interval_ms = def.watchdog_interval_ms;
        }
        self
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }
}
