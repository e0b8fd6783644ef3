use serde::{Deserialize, Serialize};

/// Alignment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DtwConfig {
    /// Band half-width as a fraction of the longer operand (default: 0.2).
    pub window_fraction: f64,
}

impl Default for DtwConfig {
    fn default() -> Self {
        Self {
            window_fraction: 0.2,
        }
    }
}

impl DtwConfig {
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn from_yaml(data: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(data)
    }

    /// Returns a copy with an unusable fraction replaced by the default and
    /// anything above 1 capped at 1.
    pub fn with_defaults(mut self) -> Self {
        if !self.window_fraction.is_finite() || self.window_fraction < 0.0 {
            self.window_fraction = Self::default().window_fraction;
        }
        self.window_fraction = self.window_fraction.min(1.0);
        self
    }
}
