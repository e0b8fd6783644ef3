use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use phonex_cluster::{build_codebook, SearchRegistry};
use phonex_dtw::AlignmentMode;
use phonex_features::{frame_count, resize, Extractor, FeatureError, FeatureSet, Normalizer};
use tracing::{debug, info};

use crate::catalog::{self, ClassId};
use crate::config::ClassifierConfig;
use crate::error::ClassifyError;
use crate::model::Model;

/// Running sum of the signals merged into one prototype.
#[derive(Debug, Clone)]
struct Bucket {
    sum: Vec<f64>,
    count: usize,
    frames: usize,
}

impl Bucket {
    fn new(signal: &[f32], frames: usize) -> Self {
        Self {
            sum: signal.iter().map(|&v| v as f64).collect(),
            count: 1,
            frames,
        }
    }

    /// Adds `signal`, stretching whichever side is shorter first.
    fn merge(&mut self, signal: &[f32]) {
        let mut incoming: Vec<f64> = signal.iter().map(|&v| v as f64).collect();
        if incoming.len() < self.sum.len() {
            incoming = resize(&incoming, self.sum.len());
        } else if self.sum.len() < incoming.len() {
            self.sum = resize(&self.sum, incoming.len());
        }
        for (s, v) in self.sum.iter_mut().zip(&incoming) {
            *s += v;
        }
        self.count += 1;
    }

    fn mean(&self) -> Vec<f32> {
        let n = self.count as f64;
        self.sum.iter().map(|&s| (s / n) as f32).collect()
    }
}

/// Collects labelled signals and turns them into a [`Model`].
///
/// Each class keeps up to `bucket_cap` buckets. Below the cap every signal
/// opens its own bucket; at the cap a signal is averaged into the bucket
/// whose frame count is closest to its own.
#[derive(Debug)]
pub struct Trainer {
    cfg: ClassifierConfig,
    extractor: Extractor,
    buckets: BTreeMap<ClassId, Vec<Bucket>>,
}

impl Trainer {
    pub fn new(cfg: ClassifierConfig) -> Result<Self, ClassifyError> {
        let cfg = cfg.with_defaults();
        let extractor = Extractor::new(cfg.features.clone())?;
        Ok(Self {
            cfg,
            extractor,
            buckets: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.cfg
    }

    /// Adds a training signal for `class`.
    ///
    /// A signal too short to yield a frame is rejected with a recoverable
    /// error and leaves the buckets untouched.
    pub fn add(&mut self, class: ClassId, signal: &[f32]) -> Result<(), ClassifyError> {
        catalog::by_id(class).ok_or(ClassifyError::UnknownClass(class))?;
        let frames = frame_count(signal.len(), self.extractor.config());
        if frames == 0 {
            debug!(class, len = signal.len(), "training signal too short");
            return Err(FeatureError::InsufficientSignal {
                len: signal.len(),
                window_width: self.extractor.config().window_width,
            }
            .into());
        }
        let buckets = self.buckets.entry(class).or_default();

        if buckets.len() < self.cfg.bucket_cap {
            buckets.push(Bucket::new(signal, frames));
            return Ok(());
        }

        let target = buckets
            .iter_mut()
            .min_by_key(|b| b.frames.abs_diff(frames))
            .ok_or(ClassifyError::UnknownClass(class))?;
        target.merge(signal);
        target.frames = frame_count(target.sum.len(), self.extractor.config());
        Ok(())
    }

    /// Adds a training signal for the class named `name`.
    pub fn add_named(&mut self, name: &str, signal: &[f32]) -> Result<(), ClassifyError> {
        let class = catalog::by_name(name).ok_or_else(|| ClassifyError::UnknownName(name.to_string()))?;
        self.add(class.id, signal)
    }

    /// Number of buckets held for `class`.
    pub fn buckets(&self, class: ClassId) -> usize {
        self.buckets.get(&class).map_or(0, Vec::len)
    }

    /// Signals merged into each bucket of `class`.
    pub fn bucket_sizes(&self, class: ClassId) -> Vec<usize> {
        self.buckets
            .get(&class)
            .map(|b| b.iter().map(|b| b.count).collect())
            .unwrap_or_default()
    }

    /// Extracts prototypes for every bucket and assembles the model.
    ///
    /// Classes are processed on one scoped thread each. Buckets whose
    /// signal is too short are skipped; any other extraction failure aborts
    /// training. With `normalize` set, corpus-wide ranges are gathered from
    /// every class before any prototype is rescaled. In quantized mode each
    /// class also gets a codebook.
    pub fn finish(self) -> Result<Model, ClassifyError> {
        let extractor = &self.extractor;
        let ranges = Mutex::new(Normalizer::new());

        let extracted: Vec<(ClassId, Result<Vec<FeatureSet>, ClassifyError>)> = thread::scope(|s| {
            let workers: Vec<_> = self
                .buckets
                .iter()
                .map(|(&class, buckets)| {
                    let ranges = &ranges;
                    let worker = s.spawn(move || extract_class(extractor, class, buckets, ranges));
                    (class, worker)
                })
                .collect();
            workers
                .into_iter()
                .map(|(class, w)| match w.join() {
                    Ok(r) => (class, r),
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let mut per_class = Vec::with_capacity(extracted.len());
        for (class, result) in extracted {
            per_class.push((class, result?));
        }

        let mut model = Model::new();
        if self.cfg.normalize {
            let normalizer = ranges.into_inner();
            for (_, sets) in per_class.iter_mut() {
                for set in sets.iter_mut() {
                    normalizer.apply(set)?;
                }
            }
            model.set_normalizer(normalizer);
        }

        let registry = Arc::new(SearchRegistry::new());
        for (class, sets) in per_class {
            if sets.is_empty() {
                continue;
            }
            if self.cfg.mode == AlignmentMode::Quantized {
                let values: Vec<&[f32]> = sets.iter().map(|s| s.mfcc.values()).collect();
                let book = build_codebook(
                    &values,
                    self.extractor.config().coefficients,
                    self.cfg.cluster_hint,
                    class as u64,
                    &registry,
                    &self.cfg.search,
                )
                .map_err(|source| ClassifyError::Codebook { class, source })?;
                model.set_codebook(class, book)?;
            }
            for set in sets {
                model.insert(class, set)?;
            }
        }

        if model.is_empty() {
            return Err(ClassifyError::EmptyModel);
        }
        info!(prototypes = model.live_prototypes(), normalized = self.cfg.normalize, "training finished");
        Ok(model)
    }
}

fn extract_class(
    extractor: &Extractor,
    class: ClassId,
    buckets: &[Bucket],
    ranges: &Mutex<Normalizer>,
) -> Result<Vec<FeatureSet>, ClassifyError> {
    let mut local = Normalizer::new();
    let mut sets = Vec::with_capacity(buckets.len());
    let mut skipped = 0usize;

    for bucket in buckets {
        let signal = bucket.mean();
        match extractor.extract_set(&signal) {
            Ok(set) => {
                local.observe(&set);
                sets.push(set);
            }
            Err(e) if e.is_recoverable() => {
                skipped += 1;
                debug!(class, len = signal.len(), error = %e, "skipping training bucket");
            }
            Err(source) => {
                return Err(ClassifyError::Training {
                    class,
                    len: signal.len(),
                    source,
                });
            }
        }
    }

    ranges.lock().merge(&local);
    info!(class, prototypes = sets.len(), skipped, "class features extracted");
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use phonex_features::FeatureConfig;

    fn tone(len: usize, hz: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * hz * i as f32 / 16000.0).sin())
            .collect()
    }

    #[test]
    fn buckets_open_until_cap_then_merge() {
        let mut trainer = Trainer::new(ClassifierConfig {
            bucket_cap: 2,
            ..Default::default()
        })
        .unwrap();

        trainer.add(1, &tone(512, 300.0)).unwrap();
        trainer.add(1, &tone(1024, 300.0)).unwrap();
        assert_eq!(trainer.buckets(1), 2);

        // Same frame count as the second bucket.
        trainer.add(1, &tone(1024, 320.0)).unwrap();
        // 7 frames: closer to the first bucket (6) than the second (14).
        trainer.add(1, &tone(576, 310.0)).unwrap();
        assert_eq!(trainer.buckets(1), 2);
        assert_eq!(trainer.bucket_sizes(1), vec![2, 2]);
    }

    #[test]
    fn rejects_unknown_labels() {
        let mut trainer = Trainer::new(ClassifierConfig::default()).unwrap();
        assert!(matches!(trainer.add(0, &[0.0; 256]), Err(ClassifyError::UnknownClass(0))));
        assert!(matches!(
            trainer.add_named("zz", &[0.0; 256]),
            Err(ClassifyError::UnknownName(_))
        ));
        trainer.add_named("aa", &[0.1; 256]).unwrap();
        assert_eq!(trainer.buckets(24), 1);
    }

    #[test]
    fn merge_stretches_shorter_side() {
        let mut b = Bucket::new(&[1.0, 1.0, 1.0, 1.0], 0);
        b.merge(&[3.0; 8]);
        assert_eq!(b.sum.len(), 8);
        assert_eq!(b.mean(), vec![2.0; 8]);

        b.merge(&[5.0, 5.0]);
        assert_eq!(b.count, 3);
        assert_eq!(b.mean(), vec![3.0; 8]);
    }

    #[test]
    fn short_signals_leave_buckets_untouched() {
        let mut trainer = Trainer::new(ClassifierConfig {
            bucket_cap: 1,
            ..Default::default()
        })
        .unwrap();
        let err = trainer.add(1, &tone(40, 500.0)).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::Feature(FeatureError::InsufficientSignal { len: 40, .. })
        ));
        assert!(err.is_recoverable());
        assert_eq!(trainer.buckets(1), 0);

        let signal = tone(1024, 500.0);
        trainer.add(1, &signal).unwrap();
        trainer.add(1, &tone(60, 900.0)).unwrap_err();
        assert_eq!(trainer.bucket_sizes(1), vec![1]);

        // The lone bucket is the tone itself.
        let model = trainer.finish().unwrap();
        let proto = &model.class(1).unwrap().prototypes[0];
        let expected = Extractor::new(FeatureConfig::default())
            .unwrap()
            .extract_set(&signal)
            .unwrap();
        assert_eq!(proto.features(), Some(&expected));
    }

    #[test]
    fn finish_without_signals_is_empty() {
        let mut trainer = Trainer::new(ClassifierConfig::default()).unwrap();
        assert!(trainer.add(2, &[0.0; 10]).is_err());
        assert!(matches!(trainer.finish(), Err(ClassifyError::EmptyModel)));
    }

    #[test]
    fn normalized_training_keeps_ranges() {
        let mut trainer = Trainer::new(ClassifierConfig {
            normalize: true,
            ..Default::default()
        })
        .unwrap();
        trainer.add(5, &tone(800, 400.0)).unwrap();
        trainer.add(6, &tone(800, 2400.0)).unwrap();

        let model = trainer.finish().unwrap();
        let norm = model.normalizer().unwrap();
        assert!(norm.mfcc.min < norm.mfcc.max);
        for (_, class) in model.classes() {
            for (_, proto) in class.live() {
                for &v in proto.features().unwrap().mfcc.values() {
                    assert!((0.0..=5.0).contains(&v), "normalized value {v} out of range");
                }
            }
        }
    }

    #[test]
    fn quantized_training_builds_codebooks() {
        let mut trainer = Trainer::new(ClassifierConfig {
            mode: AlignmentMode::Quantized,
            search: phonex_cluster::SearchConfig {
                seed: Some(11),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        trainer.add(9, &tone(1024, 3000.0)).unwrap();
        trainer.add(9, &tone(1024, 3500.0)).unwrap();

        let model = trainer.finish().unwrap();
        let book = model.class(9).unwrap().codebook.as_ref().unwrap();
        assert_eq!(book.coefficients(), 8);
    }
}
