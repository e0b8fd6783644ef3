use phonex_cluster::SearchConfig;
use phonex_dtw::{AlignmentMode, DtwConfig};
use phonex_features::{DescriptorKind, FeatureConfig};
use serde::{Deserialize, Serialize};

/// Coarse pre-classification run before the phoneme decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoarseStage {
    #[default]
    None,
    /// Voicing bucket only.
    Voice,
    /// Articulation group only.
    Group,
    /// Voicing bucket, then the group within it.
    VoiceThenGroup,
}

impl CoarseStage {
    pub fn uses_voice(self) -> bool {
        matches!(self, Self::Voice | Self::VoiceThenGroup)
    }

    pub fn uses_group(self) -> bool {
        matches!(self, Self::Group | Self::VoiceThenGroup)
    }
}

/// Configuration for training and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Neighbours voting in the phoneme stage (default: 7).
    pub k: usize,

    /// Neighbours voting in the group stage (default: 7).
    pub group_k: usize,

    /// Neighbours voting in the voice stage (default: 7).
    pub voice_k: usize,

    pub coarse: CoarseStage,

    /// Descriptor stream compared by the coarse stages.
    pub descriptor: DescriptorKind,

    /// Alignment used by the phoneme stage.
    pub mode: AlignmentMode,

    /// Training buckets per class before signals are merged (default: 25).
    pub bucket_cap: usize,

    /// Minimum cluster count hint for codebook searches (default: 2).
    pub cluster_hint: usize,

    /// Prototypes below this accuracy are pruned (default: 0.10).
    pub prune_floor: f64,

    /// Pruning never leaves a class with fewer live prototypes (default: 5).
    pub prune_min_entries: usize,

    /// Rescale training and query features with corpus-wide ranges.
    pub normalize: bool,

    pub features: FeatureConfig,
    pub dtw: DtwConfig,
    pub search: SearchConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            k: 7,
            group_k: 7,
            voice_k: 7,
            coarse: CoarseStage::None,
            descriptor: DescriptorKind::ZeroCross,
            mode: AlignmentMode::Raw,
            bucket_cap: 25,
            cluster_hint: 2,
            prune_floor: 0.10,
            prune_min_entries: 5,
            normalize: false,
            features: FeatureConfig::default(),
            dtw: DtwConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn from_yaml(data: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(data)
    }

    /// Repairs zero values and switches on the feature streams the chosen
    /// mode and coarse stage read.
    pub(crate) fn with_defaults(mut self) -> Self {
        let def = Self::default();
        if self.k == 0 {
            self.k = def.k;
        }
        if self.group_k == 0 {
            self.group_k = def.group_k;
        }
        if self.voice_k == 0 {
            self.voice_k = def.voice_k;
        }
        if self.bucket_cap == 0 {
            self.bucket_cap = def.bucket_cap;
        }
        if self.cluster_hint == 0 {
            self.cluster_hint = def.cluster_hint;
        }
        if !(0.0..=1.0).contains(&self.prune_floor) {
            self.prune_floor = def.prune_floor;
        }

        if self.mode.needs_delta() {
            self.features.delta = true;
        }
        if self.mode.needs_delta_delta() {
            self.features.delta_delta = true;
        }
        if self.coarse != CoarseStage::None || matches!(self.mode, AlignmentMode::Descriptor(_)) {
            self.features.descriptors = true;
        }
        self.dtw = self.dtw.with_defaults();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_document() {
        let cfg = ClassifierConfig::from_json(b"{}").unwrap();
        assert_eq!(cfg, ClassifierConfig::default());
        assert_eq!(cfg.k, 7);
        assert_eq!(cfg.bucket_cap, 25);
    }

    #[test]
    fn nested_yaml() {
        let doc = b"
k: 3
coarse: voice_then_group
mode: delta_delta
features:
  coefficients: 12
dtw:
  window_fraction: 0.1
";
        let cfg = ClassifierConfig::from_yaml(doc).unwrap();
        assert_eq!(cfg.k, 3);
        assert_eq!(cfg.coarse, CoarseStage::VoiceThenGroup);
        assert_eq!(cfg.mode, AlignmentMode::DeltaDelta);
        assert_eq!(cfg.features.coefficients, 12);
        assert_eq!(cfg.features.window_width, 128);
        assert_eq!(cfg.dtw.window_fraction, 0.1);
    }

    #[test]
    fn with_defaults_enables_streams() {
        let cfg = ClassifierConfig {
            k: 0,
            mode: AlignmentMode::DeltaDelta,
            coarse: CoarseStage::Group,
            ..Default::default()
        }
        .with_defaults();
        assert_eq!(cfg.k, 7);
        assert!(cfg.features.delta);
        assert!(cfg.features.delta_delta);
        assert!(cfg.features.descriptors);

        let plain = ClassifierConfig::default().with_defaults();
        assert!(!plain.features.delta);
        assert!(!plain.features.descriptors);
    }
}
