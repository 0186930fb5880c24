//! Error norms: how per-component errors combine into one scalar.
//!
//! The norm picks the region to refine next (`region_key`) and decides
//! convergence (`converged`). The drivers never look at components directly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorNorm {
    /// Every component must meet the tolerance on its own.
    #[default]
    #[serde(rename = "individual", alias = "Individual")]
    Individual,
    /// Consecutive components are real/imaginary pairs and are tested by magnitude.
    /// An odd trailing component is tested on its own.
    #[serde(rename = "paired", alias = "Paired")]
    Paired,
    #[serde(rename = "L1", alias = "l1")]
    L1,
    #[serde(rename = "L2", alias = "l2")]
    L2,
    #[serde(rename = "Linfinity", alias = "linfinity")]
    Linfinity,
}

impl ErrorNorm {
    /// Scalar error contribution of one region, used as its priority.
    pub fn region_key(self, error: &[f64]) -> f64 {
        match self {
            ErrorNorm::Individual | ErrorNorm::Linfinity => max_abs(error),
            ErrorNorm::Paired => pair_magnitudes(error).fold(0.0, nan_max),
            ErrorNorm::L1 => error.iter().map(|e| e.abs()).sum(),
            ErrorNorm::L2 => euclidean(error),
        }
    }

    /// Tests `error <= max(abs_tol, rel_tol * |estimate|)` under this norm.
    pub fn converged(self, estimate: &[f64], error: &[f64], abs_tol: f64, rel_tol: f64) -> bool {
        let within = |err: f64, val: f64| err <= abs_tol || err <= rel_tol * val.abs();
        match self {
            ErrorNorm::Individual => estimate
                .iter()
                .zip(error)
                .all(|(&val, &err)| within(err, val)),
            ErrorNorm::Paired => pair_magnitudes(estimate)
                .zip(pair_magnitudes(error))
                .all(|(val, err)| within(err, val)),
            ErrorNorm::L1 => within(
                error.iter().map(|e| e.abs()).sum(),
                estimate.iter().map(|v| v.abs()).sum(),
            ),
            ErrorNorm::L2 => within(euclidean(error), euclidean(estimate)),
            ErrorNorm::Linfinity => within(max_abs(error), max_abs(estimate)),
        }
    }
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().map(|v| v.abs()).fold(0.0, nan_max)
}

// Unlike `f64::max`, a NaN operand wins.
fn nan_max(acc: f64, value: f64) -> f64 {
    if value.is_nan() || value > acc {
        value
    } else {
        acc
    }
}

// hypot folding avoids overflow for huge components.
fn euclidean(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::hypot)
}

fn pair_magnitudes(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.chunks(2).map(euclidean)
}
