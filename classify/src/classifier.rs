use phonex_dtw::{align, AlignmentMode, Reference};
use phonex_features::{Extractor, FeatureSet};
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{self, ClassId, Group, Voice, SILENCE};
use crate::config::ClassifierConfig;
use crate::error::ClassifyError;
use crate::knn::{effective_k, rank, vote, Decision, Guess};
use crate::model::{CounterUpdate, Model};
use crate::stats::RunStatistics;

/// Outcome of one classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub decision: Decision,
    /// Voice verdict, when that stage ran.
    pub voice: Option<Voice>,
    /// Group verdict, when that stage ran.
    pub group: Option<Group>,
    /// Neighbours that voted in the phoneme stage.
    pub k: usize,
    /// Guesses that produced a usable distance in the phoneme stage.
    pub candidates: usize,
    /// Closest guess of the phoneme stage.
    #[serde(skip)]
    pub nearest: Option<Guess>,
}

impl Classification {
    fn new(decision: Decision) -> Self {
        Self {
            decision,
            voice: None,
            group: None,
            k: 0,
            candidates: 0,
            nearest: None,
        }
    }
}

/// Coarse-to-fine nearest-neighbour classifier over a trained [`Model`].
///
/// `classify` takes `&self` and may be called from many threads at once;
/// prototype counters and run statistics are accumulated under their own
/// locks after each query's alignments finish.
#[derive(Debug)]
pub struct Classifier {
    model: Model,
    cfg: ClassifierConfig,
    extractor: Extractor,
    stats: RunStatistics,
}

impl Classifier {
    pub fn new(model: Model, cfg: ClassifierConfig) -> Result<Self, ClassifyError> {
        let cfg = cfg.with_defaults();
        if model.is_empty() {
            return Err(ClassifyError::EmptyModel);
        }
        let extractor = Extractor::new(cfg.features.clone())?;
        Ok(Self {
            model,
            cfg,
            extractor,
            stats: RunStatistics::new(),
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.cfg
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    /// Extracts the query features of `signal`, rescaled with the model's
    /// ranges when it was trained normalized.
    pub fn features(&self, signal: &[f32]) -> Result<FeatureSet, ClassifyError> {
        let mut set = self.extractor.extract_set(signal)?;
        if let Some(normalizer) = self.model.normalizer() {
            normalizer.apply(&mut set)?;
        }
        Ok(set)
    }

    /// Classifies a raw signal. A signal too short to frame fails with a
    /// recoverable error.
    pub fn classify_signal(
        &self,
        signal: &[f32],
        truth: Option<ClassId>,
    ) -> Result<Classification, ClassifyError> {
        let query = self.features(signal)?;
        self.classify(&query, truth)
    }

    /// Classifies prepared query features.
    ///
    /// With `truth` set, the top-k prototypes' correct/error counters and
    /// the run statistics are updated.
    pub fn classify(
        &self,
        query: &FeatureSet,
        truth: Option<ClassId>,
    ) -> Result<Classification, ClassifyError> {
        if let Some(t) = truth {
            catalog::by_id(t).ok_or(ClassifyError::UnknownClass(t))?;
        }
        let truth_class = truth.and_then(catalog::by_id);
        let mut scope = catalog::all();
        let mut voice = None;
        let mut group = None;

        if self.cfg.coarse.uses_voice() {
            let verdict = self.coarse_vote(query, &scope, self.cfg.voice_k, |c| {
                catalog::by_id(c).map_or(Voice::Other, |p| p.voice)
            })?;
            let Some(v) = verdict else {
                return Ok(self.finish(Classification::new(Decision::NoDecision), truth));
            };
            debug!(voice = %v, "coarse voice verdict");
            if let Some(t) = truth_class {
                self.stats.record_voice(t.voice == v);
            }
            voice = Some(v);
            if v == Voice::Other {
                let mut out = Classification::new(Decision::Class(SILENCE));
                out.voice = voice;
                return Ok(self.finish(out, truth));
            }
            scope = v.classes();
        }

        if self.cfg.coarse.uses_group() {
            let verdict = self.coarse_vote(query, &scope, self.cfg.group_k, |c| {
                catalog::by_id(c).map_or(Group::Other, |p| p.group)
            })?;
            let Some(g) = verdict else {
                let mut out = Classification::new(Decision::NoDecision);
                out.voice = voice;
                return Ok(self.finish(out, truth));
            };
            debug!(group = %g, "coarse group verdict");
            if let Some(t) = truth_class {
                self.stats.record_group(t.group == g);
            }
            group = Some(g);
            if g == Group::Other {
                let mut out = Classification::new(Decision::Class(SILENCE));
                out.voice = voice;
                out.group = group;
                return Ok(self.finish(out, truth));
            }
            let members = g.classes();
            scope.retain(|c| members.contains(c));
        }

        let mut guesses = self.guesses(query, &scope, self.cfg.mode)?;
        let mut out = Classification::new(Decision::NoDecision);
        out.voice = voice;
        out.group = group;

        if guesses.is_empty() {
            warn!(classes = scope.len(), frames = query.frames(), "no usable alignment for query");
            return Ok(self.finish(out, truth));
        }

        rank(&mut guesses);
        let k = effective_k(self.cfg.k, guesses.len());
        let top = &guesses[..k];
        if let Some(winner) = vote(top, |c| c) {
            out.decision = Decision::Class(winner);
        }
        out.k = k;
        out.candidates = guesses.len();
        out.nearest = guesses.first().copied();

        let updates: Vec<CounterUpdate> = guesses
            .iter()
            .enumerate()
            .filter_map(|(pos, g)| {
                let prototype = g.prototype?;
                let voted = pos < k;
                let hit = truth.map(|t| t == g.class);
                Some(CounterUpdate {
                    class: g.class,
                    prototype,
                    used: 1,
                    correct: (voted && hit == Some(true)) as u64,
                    error: (voted && hit == Some(false)) as u64,
                })
            })
            .collect();
        self.model.accumulate(&updates);

        Ok(self.finish(out, truth))
    }

    /// Frees weak prototypes using the configured floor and minimum.
    pub fn prune(&mut self) -> usize {
        self.model.prune(self.cfg.prune_floor, self.cfg.prune_min_entries)
    }

    fn finish(&self, out: Classification, truth: Option<ClassId>) -> Classification {
        self.stats.record_decision(out.decision, truth);
        out
    }

    /// Votes over descriptor alignments against every class in `scope`.
    fn coarse_vote<B, F>(
        &self,
        query: &FeatureSet,
        scope: &[ClassId],
        k: usize,
        bucket: F,
    ) -> Result<Option<B>, ClassifyError>
    where
        B: Ord + Copy,
        F: Fn(ClassId) -> B,
    {
        let mut guesses = self.guesses(query, scope, AlignmentMode::Descriptor(self.cfg.descriptor))?;
        if guesses.is_empty() {
            warn!(classes = scope.len(), "no usable alignment in coarse stage");
            return Ok(None);
        }
        rank(&mut guesses);
        let k = effective_k(k, guesses.len());
        Ok(vote(&guesses[..k], bucket))
    }

    /// Aligns the query against the candidates of `scope` under `mode`.
    ///
    /// Recoverable failures drop the single comparison; anything else
    /// aborts with the class and prototype that failed.
    fn guesses(
        &self,
        query: &FeatureSet,
        scope: &[ClassId],
        mode: AlignmentMode,
    ) -> Result<Vec<Guess>, ClassifyError> {
        let mut guesses = Vec::new();
        let mut failed = 0u64;

        let mut attempt = |class: ClassId, prototype: Option<usize>, reference| {
            match align(query, reference, mode, &self.cfg.dtw) {
                Ok(distance) => {
                    guesses.push(Guess {
                        distance,
                        class,
                        prototype,
                    });
                    Ok(())
                }
                Err(e) if e.is_recoverable() => {
                    failed += 1;
                    debug!(class, ?prototype, error = %e, "comparison skipped");
                    Ok(())
                }
                Err(source) => Err(ClassifyError::Comparison {
                    class,
                    prototype,
                    source,
                }),
            }
        };

        if mode == AlignmentMode::Quantized {
            for &class in scope {
                if let Some(book) = self.model.class(class).and_then(|c| c.codebook.as_ref()) {
                    attempt(class, None, Reference::Codebook(book))?;
                }
            }
        } else {
            for (class, index) in self.select(scope, query.frames()) {
                let Some(features) = self
                    .model
                    .class(class)
                    .and_then(|c| c.prototypes.get(index))
                    .and_then(|p| p.features())
                else {
                    continue;
                };
                attempt(class, Some(index), Reference::Prototype(features))?;
            }
        }

        self.stats.record_alignments(guesses.len() as u64, failed);
        Ok(guesses)
    }

    /// Picks the prototypes to align against.
    ///
    /// Every live prototype with the query's frame count is used. When none
    /// matches, or the live pool holds exactly one prototype per class in
    /// play, each class contributes its prototype closest in length to the
    /// query instead.
    fn select(&self, scope: &[ClassId], frames: usize) -> Vec<(ClassId, usize)> {
        let mut exact = Vec::new();
        let mut closest = Vec::new();
        let mut pool = 0;
        for &class in scope {
            let Some(model) = self.model.class(class) else {
                continue;
            };
            let mut best: Option<(usize, usize)> = None;
            for (i, p) in model.live() {
                pool += 1;
                if p.frames() == frames {
                    exact.push((class, i));
                }
                let gap = p.frames().abs_diff(frames);
                if best.is_none_or(|(_, g)| gap < g) {
                    best = Some((i, gap));
                }
            }
            if let Some((i, _)) = best {
                closest.push((class, i));
            }
        }

        if exact.is_empty() || pool == closest.len() {
            closest
        } else {
            exact
        }
    }
}
