//! Settings and result types shared by the drivers.

use serde::{Deserialize, Serialize};

use crate::error::CubatureError;
use crate::norm::ErrorNorm;

/// Refinement strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Bisect the region with the largest error (mesh refinement).
    #[default]
    HAdaptive,
    /// Raise the rule degree on the whole domain.
    PAdaptive,
}

/// Termination policy and strategy for one integration call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubatureSettings {
    pub abs_tol: f64,
    pub rel_tol: f64,
    /// Evaluation budget; `0` means unbounded.
    pub max_evals: usize,
    pub norm: ErrorNorm,
    pub strategy: Strategy,
}

impl Default for CubatureSettings {
    fn default() -> Self {
        Self {
            abs_tol: 1e-8,
            rel_tol: 1e-8,
            max_evals: 0,
            norm: ErrorNorm::Individual,
            strategy: Strategy::HAdaptive,
        }
    }
}

impl CubatureSettings {
    pub fn validate(&self) -> Result<(), CubatureError> {
        for (name, value) in [("abs_tol", self.abs_tol), ("rel_tol", self.rel_tol)] {
            if value.is_nan() || value < 0.0 {
                return Err(CubatureError::InvalidTolerance {
                    message: format!("{name} must be non-negative, got {value}"),
                });
            }
        }
        if self.abs_tol == 0.0 && self.rel_tol == 0.0 && self.max_evals == 0 {
            return Err(CubatureError::InvalidTolerance {
                message: "abs_tol and rel_tol are both zero and max_evals is unbounded".into(),
            });
        }
        Ok(())
    }
}

/// Why an integration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The error norm met the tolerance.
    Converged,
    /// The evaluation budget ran out first.
    MaxEvals,
    /// No region (or rule level) could be refined any further.
    RegionLimit,
    /// A NaN or infinity showed up in the estimate or error.
    NumericalDegeneracy,
    /// The caller finished a stepped run before any other condition held.
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CubatureResult {
    pub estimate: Vec<f64>,
    pub error: Vec<f64>,
    pub converged: bool,
    pub evals_used: usize,
    pub status: Termination,
    /// Live regions at termination; the p-adaptive driver always reports 1.
    pub regions: usize,
    pub iterations: usize,
}

/// Snapshot reported between steps of a stepped run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CubatureProgress {
    pub done: bool,
    pub status: Option<Termination>,
    pub estimate: Vec<f64>,
    pub error: Vec<f64>,
    pub evals_used: usize,
    pub max_evals: usize,
    pub regions: usize,
    pub iterations: usize,
}
