use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::ClassId;

/// One alignment outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guess {
    pub distance: f64,
    pub class: ClassId,
    /// Index of the prototype within its class; `None` for codebook guesses.
    pub prototype: Option<usize>,
}

/// Result of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Decision {
    Class(ClassId),
    /// No alignment produced a usable distance.
    NoDecision,
}

impl Decision {
    pub fn class(self) -> Option<ClassId> {
        match self {
            Decision::Class(id) => Some(id),
            Decision::NoDecision => None,
        }
    }
}

/// Neighbour count used for `candidates` guesses.
///
/// A `k` that is not smaller than the candidate count becomes
/// `max(1, candidates / 3)`.
pub fn effective_k(k: usize, candidates: usize) -> usize {
    if k >= candidates {
        (candidates / 3).max(1)
    } else {
        k
    }
}

/// Sorts guesses by ascending distance. The sort is stable, so equal
/// distances keep their alignment order.
pub fn rank(guesses: &mut [Guess]) {
    guesses.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
}

/// Plurality vote over `top`, tallied into the buckets `bucket` maps each
/// class to. Ties go to the smallest bucket.
pub fn vote<B, F>(top: &[Guess], bucket: F) -> Option<B>
where
    B: Ord + Copy,
    F: Fn(ClassId) -> B,
{
    let mut tally: BTreeMap<B, usize> = BTreeMap::new();
    for g in top {
        *tally.entry(bucket(g.class)).or_default() += 1;
    }
    let mut best: Option<(B, usize)> = None;
    for (b, n) in tally {
        if best.is_none_or(|(_, most)| n > most) {
            best = Some((b, n));
        }
    }
    best.map(|(b, _)| b)
}
