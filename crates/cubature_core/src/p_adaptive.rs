//! p-adaptive driver: raises the Clenshaw-Curtis level of one axis at a time
//! on the single root region.
//!
//! Each step refines the axis whose error (the rule against its embedded
//! lower rule in that axis) is largest. Integrand values are cached by node
//! key, so nodes shared with coarser grids are never evaluated twice.

use std::collections::HashMap;

use nalgebra::DVector;
use tracing::{debug, trace};

use crate::error::CubatureError;
use crate::region::validate_domain;
use crate::rules::clenshaw_curtis::{LevelRule, LevelRules};
use crate::traits::Integrand;
use crate::types::{CubatureProgress, CubatureResult, CubatureSettings, Termination};

/// Largest tensor grid the driver will evaluate.
pub const MAX_GRID_POINTS: usize = 1 << 20;

pub struct PAdaptive<I: Integrand> {
    integrand: I,
    settings: CubatureSettings,
    center: Vec<f64>,
    half: Vec<f64>,
    rules: LevelRules,
    levels: Vec<usize>,
    /// Node key tuple to row of `values`.
    cache: HashMap<Vec<u32>, usize>,
    values: Vec<f64>,
    estimate: DVector<f64>,
    error: DVector<f64>,
    /// Norm-combined error of each axis, the refinement priority.
    axis_keys: Vec<f64>,
    evals: usize,
    iterations: usize,
    status: Option<Termination>,
}

impl<I: Integrand> PAdaptive<I> {
    /// Validates the problem and evaluates the level-0 grid.
    pub fn new(
        integrand: I,
        lower: &[f64],
        upper: &[f64],
        settings: CubatureSettings,
    ) -> Result<Self, CubatureError> {
        settings.validate()?;
        validate_domain(&integrand, lower, upper)?;

        let ndim = integrand.ndim();
        let fdim = integrand.fdim();
        let level0 = (0..ndim).try_fold(1usize, |n, _| n.checked_mul(nodes_at_level(0)));
        if level0.map_or(true, |n| n > MAX_GRID_POINTS) {
            return Err(CubatureError::GridTooLarge {
                ndim,
                limit: MAX_GRID_POINTS,
            });
        }
        let mut rules = LevelRules::new();
        rules.ensure(0);

        let mut driver = Self {
            center: lower
                .iter()
                .zip(upper)
                .map(|(lo, hi)| 0.5 * lo + 0.5 * hi)
                .collect(),
            half: lower.iter().zip(upper).map(|(lo, hi)| 0.5 * (hi - lo)).collect(),
            integrand,
            settings,
            rules,
            levels: vec![0; ndim],
            cache: HashMap::new(),
            values: Vec::new(),
            estimate: DVector::zeros(fdim),
            error: DVector::zeros(fdim),
            axis_keys: vec![0.0; ndim],
            evals: 0,
            iterations: 0,
            status: None,
        };
        driver.evaluate_grid()?;

        debug!(
            ndim,
            fdim,
            evals = driver.evals,
            max_evals = settings.max_evals,
            "p-adaptive integration started"
        );
        Ok(driver)
    }

    pub fn settings(&self) -> &CubatureSettings {
        &self.settings
    }

    /// Current rule level of each axis.
    pub fn levels(&self) -> &[usize] {
        &self.levels
    }

    pub fn is_done(&self) -> bool {
        self.status.is_some()
    }

    /// Raises the level of the worst axis. Returns `Ok(false)` once terminated.
    ///
    /// An integrand failure leaves the levels and estimates as they were.
    pub fn step(&mut self) -> Result<bool, CubatureError> {
        if self.status.is_some() {
            return Ok(false);
        }
        if let Some(status) = self.check_termination() {
            self.terminate(status);
            return Ok(false);
        }

        let axis = self.worst_axis();
        let previous = self.levels[axis];
        let next = previous + 1;
        if !self.rules.ensure(next) || self.grid_size_with(axis, next) > MAX_GRID_POINTS {
            trace!(axis, level = next, "rule level cannot be raised");
            self.terminate(Termination::RegionLimit);
            return Ok(false);
        }

        self.levels[axis] = next;
        if let Err(err) = self.evaluate_grid() {
            self.levels[axis] = previous;
            return Err(err);
        }
        trace!(axis, level = next, evals = self.evals, "raised rule level");

        self.iterations += 1;
        Ok(true)
    }

    pub fn run_steps(&mut self, max_steps: usize) -> Result<CubatureProgress, CubatureError> {
        for _ in 0..max_steps {
            if !self.step()? {
                break;
            }
        }
        Ok(self.progress())
    }

    pub fn run(&mut self) -> Result<(), CubatureError> {
        while self.step()? {}
        Ok(())
    }

    pub fn progress(&self) -> CubatureProgress {
        CubatureProgress {
            done: self.is_done(),
            status: self.status,
            estimate: self.estimate.iter().copied().collect(),
            error: self.error.iter().copied().collect(),
            evals_used: self.evals,
            max_evals: self.settings.max_evals,
            regions: 1,
            iterations: self.iterations,
        }
    }

    pub fn result(&self) -> CubatureResult {
        let status = self
            .status
            .or_else(|| self.check_termination())
            .unwrap_or(Termination::Stopped);
        CubatureResult {
            estimate: self.estimate.iter().copied().collect(),
            error: self.error.iter().copied().collect(),
            converged: status == Termination::Converged,
            evals_used: self.evals,
            status,
            regions: 1,
            iterations: self.iterations,
        }
    }

    pub fn finish(mut self) -> CubatureResult {
        if self.status.is_none() {
            let status = self.check_termination().unwrap_or(Termination::Stopped);
            self.terminate(status);
        }
        self.result()
    }

    fn check_termination(&self) -> Option<Termination> {
        let settings = &self.settings;
        let finite = self
            .estimate
            .iter()
            .chain(self.error.iter())
            .all(|v| v.is_finite());
        if !finite {
            return Some(Termination::NumericalDegeneracy);
        }
        if settings.norm.converged(
            self.estimate.as_slice(),
            self.error.as_slice(),
            settings.abs_tol,
            settings.rel_tol,
        ) {
            return Some(Termination::Converged);
        }
        if settings.max_evals > 0 && self.evals >= settings.max_evals {
            return Some(Termination::MaxEvals);
        }
        None
    }

    fn terminate(&mut self, status: Termination) {
        self.status = Some(status);
        debug!(
            ?status,
            evals = self.evals,
            levels = ?self.levels,
            iterations = self.iterations,
            "p-adaptive integration finished"
        );
    }

    // First axis wins ties.
    fn worst_axis(&self) -> usize {
        let mut worst = 0;
        for (axis, &key) in self.axis_keys.iter().enumerate() {
            if key > self.axis_keys[worst] {
                worst = axis;
            }
        }
        worst
    }

    fn grid_size_with(&self, axis: usize, level: usize) -> usize {
        self.levels
            .iter()
            .enumerate()
            .map(|(i, &m)| nodes_at_level(if i == axis { level } else { m }))
            .product()
    }

    /// Evaluates the uncached nodes of the current grid in one batch, then
    /// recomputes the estimate and the per-axis errors.
    fn evaluate_grid(&mut self) -> Result<(), CubatureError> {
        let ndim = self.levels.len();
        let fdim = self.estimate.len();
        let rules: Vec<&LevelRule> = self.levels.iter().map(|&m| self.rules.level(m)).collect();
        let lens: Vec<usize> = rules.iter().map(|rule| rule.len()).collect();

        let mut index = vec![0usize; ndim];
        let mut key = vec![0u32; ndim];
        let mut missing: Vec<Vec<u32>> = Vec::new();
        let mut points: Vec<f64> = Vec::new();
        loop {
            for axis in 0..ndim {
                key[axis] = rules[axis].keys[index[axis]];
            }
            if !self.cache.contains_key(key.as_slice()) {
                missing.push(key.clone());
                for axis in 0..ndim {
                    points.push(self.center[axis] + self.half[axis] * rules[axis].nodes[index[axis]]);
                }
            }
            if !advance(&mut index, &lens) {
                break;
            }
        }

        if !missing.is_empty() {
            let mut values = vec![0.0; missing.len() * fdim];
            self.integrand
                .eval_batch(&points, &mut values)
                .map_err(CubatureError::Integrand)?;
            self.evals += missing.len();
            for (key, row) in missing.into_iter().zip(values.chunks_exact(fdim)) {
                self.cache.insert(key, self.values.len() / fdim);
                self.values.extend_from_slice(row);
            }
        }

        let mut estimate = DVector::zeros(fdim);
        let mut lowered = vec![DVector::<f64>::zeros(fdim); ndim];
        index.fill(0);
        loop {
            for axis in 0..ndim {
                key[axis] = rules[axis].keys[index[axis]];
            }
            let row = self.cache[key.as_slice()];
            let f = &self.values[row * fdim..(row + 1) * fdim];

            let weight: f64 = (0..ndim).map(|i| rules[i].weights[index[i]]).product();
            for (k, value) in f.iter().enumerate() {
                estimate[k] += weight * value;
            }
            for (j, sum) in lowered.iter_mut().enumerate() {
                let lowered_weight: f64 = (0..ndim)
                    .map(|i| {
                        if i == j {
                            rules[i].embedded[index[i]]
                        } else {
                            rules[i].weights[index[i]]
                        }
                    })
                    .product();
                if lowered_weight != 0.0 {
                    for (k, value) in f.iter().enumerate() {
                        sum[k] += lowered_weight * value;
                    }
                }
            }

            if !advance(&mut index, &lens) {
                break;
            }
        }

        let jacobian: f64 = self.half.iter().product();
        estimate *= jacobian;
        let mut error = DVector::zeros(fdim);
        for (axis, sum) in lowered.iter().enumerate() {
            let axis_error: Vec<f64> = estimate
                .iter()
                .zip(sum.iter())
                .map(|(value, lower)| (value - jacobian * lower).abs())
                .collect();
            for (k, e) in axis_error.iter().enumerate() {
                if *e > error[k] || e.is_nan() {
                    error[k] = *e;
                }
            }
            self.axis_keys[axis] = self.settings.norm.region_key(&axis_error);
        }

        self.estimate = estimate;
        self.error = error;
        Ok(())
    }
}

fn nodes_at_level(level: usize) -> usize {
    (2usize << level) + 1
}

/// Odometer increment over a tensor grid; `false` after the last index.
fn advance(index: &mut [usize], lens: &[usize]) -> bool {
    for (i, &len) in index.iter_mut().zip(lens) {
        *i += 1;
        if *i < len {
            return true;
        }
        *i = 0;
    }
    false
}
