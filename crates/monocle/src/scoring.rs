use serde::{Deserialize, Serialize};

use crate::vector;

/// A later candidate replaces the current best only if its similarity exceeds
/// the best by this factor, so near-equal candidates don't flip-flop.
/// Empirically tuned.
pub const SIMILARITY_BIAS: f64 = 1.05;

/// Minimum similarity for a candidate to be accepted at all. Empirically tuned.
pub const SIMILARITY_FLOOR: f64 = 0.1;

/// A heavy-atom hypothesis is only kept if the best plain-carbon divergence
/// is at least this many times larger (a variance-ratio style test).
/// Empirically tuned.
pub const HEAVY_ATOM_MARGIN: f64 = 1.5;

/// Rule used to compare an observed isotopic envelope with the theoretical one
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreType {
    /// Dot product of max-scaled envelopes, higher is better
    DotProduct,
    /// Chi-squared divergence of sum-normalized envelopes, lower is better
    ChiSquared,
}

/// Strategy used by the charge state engine to rank envelope matches.
/// Chosen once per run, so the comparison loop never branches on the rule.
pub trait EnvelopeScorer: Sync {
    /// Worst possible score, used before any candidate was seen
    fn initial(&self) -> f64;

    fn higher_is_better(&self) -> bool;

    /// Rescale a theoretical or observed envelope prior to comparison
    fn prepare(&self, values: &mut [f64]);

    fn score(&self, observed: &[f64], expected: &[f64]) -> f64;

    /// Does `score` displace the current `best`?
    fn improves(&self, score: f64, best: f64) -> bool;

    /// Is `score` good enough to be assigned, once it became the best?
    fn accept(&self, score: f64) -> bool;

    /// Should the best overall heavy-atom hypothesis be kept over the best
    /// plain-carbon one?
    fn keep_heavy_atom(&self, heavy: f64, plain: f64) -> bool;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct DotProduct;

#[derive(Copy, Clone, Debug, Default)]
pub struct ChiSquared;

impl EnvelopeScorer for DotProduct {
    fn initial(&self) -> f64 {
        -1.0
    }

    fn higher_is_better(&self) -> bool {
        true
    }

    fn prepare(&self, values: &mut [f64]) {
        vector::scale(values)
    }

    fn score(&self, observed: &[f64], expected: &[f64]) -> f64 {
        vector::dot(observed, expected)
    }

    fn improves(&self, score: f64, best: f64) -> bool {
        score > best * SIMILARITY_BIAS
    }

    fn accept(&self, score: f64) -> bool {
        score > SIMILARITY_FLOOR
    }

    fn keep_heavy_atom(&self, _: f64, _: f64) -> bool {
        true
    }
}

impl EnvelopeScorer for ChiSquared {
    fn initial(&self) -> f64 {
        f64::INFINITY
    }

    fn higher_is_better(&self) -> bool {
        false
    }

    fn prepare(&self, values: &mut [f64]) {
        vector::normalize(values)
    }

    fn score(&self, observed: &[f64], expected: &[f64]) -> f64 {
        vector::chi_squared(observed, expected)
    }

    fn improves(&self, score: f64, best: f64) -> bool {
        score < best
    }

    fn accept(&self, _: f64) -> bool {
        true
    }

    fn keep_heavy_atom(&self, heavy: f64, plain: f64) -> bool {
        if heavy > 0.0 {
            plain / heavy >= HEAVY_ATOM_MARGIN
        } else {
            plain > 0.0
        }
    }
}
