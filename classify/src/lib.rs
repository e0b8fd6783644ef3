//! Hierarchical nearest-neighbour phoneme classification.
//!
//! A [`Trainer`] turns labelled signals into a [`Model`] of per-class
//! prototypes (and codebooks, in quantized mode). A [`Classifier`] aligns a
//! query against the model with DTW and votes among the `k` nearest
//! prototypes, optionally narrowing the candidate classes first with a
//! coarse voice and/or group stage driven by time-domain descriptors.
//!
//! # Usage
//!
//! ```no_run
//! use phonex_classify::{Classifier, ClassifierConfig, Trainer};
//!
//! # fn signal(_: &str) -> Vec<f32> { vec![0.0; 1024] }
//! let cfg = ClassifierConfig::default();
//! let mut trainer = Trainer::new(cfg.clone())?;
//! trainer.add_named("aa", &signal("aa-1"))?;
//! trainer.add_named("s", &signal("s-1"))?;
//!
//! let classifier = Classifier::new(trainer.finish()?, cfg)?;
//! let out = classifier.classify_signal(&signal("query"), None)?;
//! println!("{:?}", out.decision);
//! # Ok::<(), phonex_classify::ClassifyError>(())
//! ```

pub mod catalog;
mod classifier;
mod config;
mod error;
mod knn;
mod model;
mod stats;
mod trainer;

pub use catalog::{ClassId, Group, PhonemeClass, Voice, SILENCE};
pub use classifier::{Classification, Classifier};
pub use config::{ClassifierConfig, CoarseStage};
pub use error::ClassifyError;
pub use knn::{effective_k, rank, vote, Decision, Guess};
pub use model::{ClassModel, Counters, Model, Prototype};
pub use stats::{RunStatistics, StatsSnapshot};
pub use trainer::Trainer;
