use std::collections::BTreeMap;

use parking_lot::Mutex;
use phonex_cluster::Codebook;
use phonex_features::{FeatureSet, Normalizer};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{self, ClassId};
use crate::error::ClassifyError;

/// Online usage and accuracy tallies of one prototype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Alignments computed against the prototype.
    pub used: u64,
    /// Top-k appearances for a query of the same class.
    pub correct: u64,
    /// Top-k appearances for a query of another class.
    pub error: u64,
}

impl Counters {
    /// `correct / (correct + error)`, or `None` before any vote.
    pub fn accuracy(&self) -> Option<f64> {
        let votes = self.correct + self.error;
        (votes > 0).then(|| self.correct as f64 / votes as f64)
    }
}

/// One trained reference sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
    features: Option<FeatureSet>,
    frames: usize,
}

impl Prototype {
    pub fn new(features: FeatureSet) -> Self {
        let frames = features.frames();
        Self {
            features: Some(features),
            frames,
        }
    }

    /// The stored features, `None` once pruned.
    pub fn features(&self) -> Option<&FeatureSet> {
        self.features.as_ref()
    }

    /// Frame count, 0 once pruned.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_pruned(&self) -> bool {
        self.features.is_none()
    }

    fn prune(&mut self) {
        self.features = None;
        self.frames = 0;
    }
}

/// Trained material of one class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassModel {
    pub prototypes: Vec<Prototype>,
    pub codebook: Option<Codebook>,
}

impl ClassModel {
    /// Prototypes that still hold features, with their indices.
    pub fn live(&self) -> impl Iterator<Item = (usize, &Prototype)> {
        self.prototypes.iter().enumerate().filter(|(_, p)| !p.is_pruned())
    }
}

/// Prototypes and codebooks per class, plus their counters.
///
/// The trained material is read-only during classification; counters are
/// accumulated behind a single lock.
#[derive(Debug, Default)]
pub struct Model {
    classes: BTreeMap<ClassId, ClassModel>,
    counters: Mutex<BTreeMap<ClassId, Vec<Counters>>>,
    normalizer: Option<Normalizer>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a prototype to `class` and returns its index.
    pub fn insert(&mut self, class: ClassId, features: FeatureSet) -> Result<usize, ClassifyError> {
        catalog::by_id(class).ok_or(ClassifyError::UnknownClass(class))?;
        let entry = self.classes.entry(class).or_default();
        entry.prototypes.push(Prototype::new(features));
        self.counters
            .get_mut()
            .entry(class)
            .or_default()
            .push(Counters::default());
        Ok(entry.prototypes.len() - 1)
    }

    pub fn set_codebook(&mut self, class: ClassId, codebook: Codebook) -> Result<(), ClassifyError> {
        catalog::by_id(class).ok_or(ClassifyError::UnknownClass(class))?;
        self.classes.entry(class).or_default().codebook = Some(codebook);
        Ok(())
    }

    pub fn set_normalizer(&mut self, normalizer: Normalizer) {
        self.normalizer = Some(normalizer);
    }

    pub fn normalizer(&self) -> Option<&Normalizer> {
        self.normalizer.as_ref()
    }

    pub fn class(&self, class: ClassId) -> Option<&ClassModel> {
        self.classes.get(&class)
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassModel)> {
        self.classes.iter().map(|(&id, m)| (id, m))
    }

    pub fn is_empty(&self) -> bool {
        self.classes.values().all(|c| c.live().next().is_none() && c.codebook.is_none())
    }

    /// Live prototypes across all classes.
    pub fn live_prototypes(&self) -> usize {
        self.classes.values().map(|c| c.live().count()).sum()
    }

    pub fn counters(&self, class: ClassId, prototype: usize) -> Option<Counters> {
        self.counters
            .lock()
            .get(&class)
            .and_then(|v| v.get(prototype))
            .copied()
    }

    /// Applies a batch of counter updates under one lock acquisition.
    pub(crate) fn accumulate(&self, updates: &[CounterUpdate]) {
        if updates.is_empty() {
            return;
        }
        let mut counters = self.counters.lock();
        for u in updates {
            if let Some(c) = counters.get_mut(&u.class).and_then(|v| v.get_mut(u.prototype)) {
                c.used += u.used;
                c.correct += u.correct;
                c.error += u.error;
            }
        }
    }

    /// Frees prototypes whose accuracy fell below `floor`.
    ///
    /// Prototypes without votes are kept, and a class is never pruned down
    /// to fewer than `min_entries` live prototypes. Returns how many were
    /// freed.
    pub fn prune(&mut self, floor: f64, min_entries: usize) -> usize {
        let counters = self.counters.get_mut();
        let mut freed = 0;
        for (&id, class) in self.classes.iter_mut() {
            let Some(tallies) = counters.get(&id) else {
                continue;
            };
            let mut live = class.live().count();
            for (i, proto) in class.prototypes.iter_mut().enumerate() {
                if live <= min_entries {
                    break;
                }
                if proto.is_pruned() {
                    continue;
                }
                let weak = tallies
                    .get(i)
                    .and_then(Counters::accuracy)
                    .is_some_and(|acc| acc < floor);
                if weak {
                    proto.prune();
                    live -= 1;
                    freed += 1;
                }
            }
        }
        info!(freed, floor, min_entries, "pruned prototypes");
        freed
    }
}

/// Pending change to one prototype's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CounterUpdate {
    pub class: ClassId,
    pub prototype: usize,
    pub used: u64,
    pub correct: u64,
    pub error: u64,
}
