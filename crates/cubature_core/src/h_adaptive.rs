//! h-adaptive driver: repeatedly bisects the region with the largest error.
//!
//! The driver is steppable. `step` performs one bisection (two child
//! evaluations in a single integrand batch) and termination is only checked
//! between steps, so stopping after any step leaves a consistent state.

use nalgebra::DVector;
use tracing::{debug, trace};

use crate::error::CubatureError;
use crate::region::{validate_domain, Region, RegionHeap};
use crate::rules::{CubatureRule, HRule};
use crate::traits::Integrand;
use crate::types::{CubatureProgress, CubatureResult, CubatureSettings, Termination};

/// Running totals and the live region set of one integration.
pub struct GlobalState {
    pub estimate: DVector<f64>,
    pub error: DVector<f64>,
    heap: RegionHeap,
    /// Regions whose split axis has no representable midpoint. Still counted in the totals.
    frozen: Vec<Region>,
    pub evals: usize,
    pub iterations: usize,
}

impl GlobalState {
    fn new(settings: &CubatureSettings, fdim: usize) -> Self {
        Self {
            estimate: DVector::zeros(fdim),
            error: DVector::zeros(fdim),
            heap: RegionHeap::new(settings.norm),
            frozen: Vec::new(),
            evals: 0,
            iterations: 0,
        }
    }

    fn push(&mut self, region: Region) {
        self.estimate += &region.estimate;
        self.error += &region.error;
        self.heap.push(region);
    }

    fn pop_worst(&mut self) -> Option<Region> {
        let region = self.heap.pop()?;
        self.estimate -= &region.estimate;
        self.error -= &region.error;
        Some(region)
    }

    fn freeze(&mut self, region: Region) {
        self.estimate += &region.estimate;
        self.error += &region.error;
        self.frozen.push(region);
    }

    /// Live plus frozen region count.
    pub fn regions(&self) -> usize {
        self.heap.len() + self.frozen.len()
    }

    /// Totals summed afresh over every region, free of the running-sum drift.
    pub fn resummed(&self) -> (DVector<f64>, DVector<f64>) {
        let fdim = self.estimate.len();
        let mut estimate = DVector::zeros(fdim);
        let mut error = DVector::zeros(fdim);
        for region in self.heap.iter().chain(self.frozen.iter()) {
            estimate += &region.estimate;
            error += &region.error;
        }
        (estimate, error)
    }

    /// Convergence of the running totals, confirmed on re-summed ones.
    ///
    /// Subtracting popped regions can leave the running error below the
    /// true sum, so a pass on the running totals alone is not trusted.
    fn converged(&self, settings: &CubatureSettings) -> bool {
        if !self.running_converged(settings) {
            return false;
        }
        let (estimate, error) = self.resummed();
        meets_tolerance(settings, &estimate, &error)
    }

    fn running_converged(&self, settings: &CubatureSettings) -> bool {
        meets_tolerance(settings, &self.estimate, &self.error)
    }

    /// Replaces the running totals with exact sums over the regions.
    fn resync(&mut self) {
        let (estimate, error) = self.resummed();
        self.estimate = estimate;
        self.error = error;
    }

    fn is_finite(&self) -> bool {
        self.estimate
            .iter()
            .chain(self.error.iter())
            .all(|v| v.is_finite())
    }
}

fn meets_tolerance(settings: &CubatureSettings, estimate: &DVector<f64>, error: &DVector<f64>) -> bool {
    settings.norm.converged(
        estimate.as_slice(),
        error.as_slice(),
        settings.abs_tol,
        settings.rel_tol,
    )
}

pub struct HAdaptive<I: Integrand> {
    integrand: I,
    rule: HRule,
    settings: CubatureSettings,
    state: GlobalState,
    status: Option<Termination>,
}

impl<I: Integrand> HAdaptive<I> {
    /// Validates the problem and evaluates the root region.
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
        let rule = HRule::for_dimension(ndim)?;
        let mut root = [Region::new(lower.to_vec(), upper.to_vec(), fdim)];
        let evals = rule.evaluate(&integrand, &mut root)?;
        let [root] = root;

        debug!(
            ndim,
            fdim,
            points_per_region = rule.points_per_region(),
            max_evals = settings.max_evals,
            "h-adaptive integration started"
        );

        let mut state = GlobalState::new(&settings, fdim);
        state.evals = evals;
        state.push(root);

        Ok(Self {
            integrand,
            rule,
            settings,
            state,
            status: None,
        })
    }

    pub fn settings(&self) -> &CubatureSettings {
        &self.settings
    }

    pub fn state(&self) -> &GlobalState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        self.status.is_some()
    }

    /// Performs one refinement. Returns `Ok(false)` once the integration has terminated.
    ///
    /// An integrand failure leaves the state as it was before the step.
    pub fn step(&mut self) -> Result<bool, CubatureError> {
        if self.status.is_some() {
            return Ok(false);
        }
        if let Some(status) = self.check_termination() {
            self.terminate(status);
            return Ok(false);
        }
        if self.state.running_converged(&self.settings) {
            trace!("running totals drifted below the tolerance, re-summing");
            self.state.resync();
        }

        let Some(parent) = self.state.pop_worst() else {
            self.terminate(Termination::RegionLimit);
            return Ok(false);
        };

        match parent.bisect() {
            Some((left, right)) => {
                let mut children = [left, right];
                match self.rule.evaluate(&self.integrand, &mut children) {
                    Ok(evals) => self.state.evals += evals,
                    Err(err) => {
                        self.state.push(parent);
                        return Err(err);
                    }
                }
                trace!(
                    axis = parent.split_dim,
                    at = children[0].upper[parent.split_dim],
                    evals = self.state.evals,
                    "bisected region"
                );
                let [left, right] = children;
                self.state.push(left);
                self.state.push(right);
            }
            None => {
                trace!(axis = parent.split_dim, "region cannot be bisected further");
                self.state.freeze(parent);
            }
        }

        self.state.iterations += 1;
        Ok(true)
    }

    /// Runs up to `max_steps` steps and reports where the integration stands.
    pub fn run_steps(&mut self, max_steps: usize) -> Result<CubatureProgress, CubatureError> {
        for _ in 0..max_steps {
            if !self.step()? {
                break;
            }
        }
        Ok(self.progress())
    }

    /// Runs until a termination condition holds.
    pub fn run(&mut self) -> Result<(), CubatureError> {
        while self.step()? {}
        Ok(())
    }

    pub fn progress(&self) -> CubatureProgress {
        CubatureProgress {
            done: self.is_done(),
            status: self.status,
            estimate: self.state.estimate.iter().copied().collect(),
            error: self.state.error.iter().copied().collect(),
            evals_used: self.state.evals,
            max_evals: self.settings.max_evals,
            regions: self.state.regions(),
            iterations: self.state.iterations,
        }
    }

    /// Result with totals re-summed over all regions.
    ///
    /// Before termination the status is whatever condition already holds, else `Stopped`.
    pub fn result(&self) -> CubatureResult {
        let status = self
            .status
            .or_else(|| self.check_termination())
            .unwrap_or(Termination::Stopped);
        let (estimate, error) = self.state.resummed();
        CubatureResult {
            estimate: estimate.iter().copied().collect(),
            error: error.iter().copied().collect(),
            converged: status == Termination::Converged,
            evals_used: self.state.evals,
            status,
            regions: self.state.regions(),
            iterations: self.state.iterations,
        }
    }

    pub fn finish(mut self) -> CubatureResult {
        if self.status.is_none() {
            let status = self.check_termination().unwrap_or(Termination::Stopped);
            self.terminate(status);
        }
        self.result()
    }

    // Degeneracy first, then convergence before the budget.
    fn check_termination(&self) -> Option<Termination> {
        let settings = &self.settings;
        if !self.state.is_finite() {
            return Some(Termination::NumericalDegeneracy);
        }
        if self.state.converged(settings) {
            return Some(Termination::Converged);
        }
        if settings.max_evals > 0 && self.state.evals >= settings.max_evals {
            return Some(Termination::MaxEvals);
        }
        if self.state.heap.is_empty() {
            return Some(Termination::RegionLimit);
        }
        None
    }

    fn terminate(&mut self, status: Termination) {
        self.status = Some(status);
        debug!(
            ?status,
            evals = self.state.evals,
            regions = self.state.regions(),
            iterations = self.state.iterations,
            "h-adaptive integration finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrands::{
        cubature_one, cubature_one_exact, cubature_two, cubature_two_exact, cubature_zero,
        cubature_zero_exact, genz_oscillatory, genz_oscillatory_exact,
    };
    use crate::norm::ErrorNorm;
    use crate::traits::{scalar_integrand, FnIntegrand};
    use anyhow::bail;
    use proptest::prelude::*;
    use std::cell::Cell;

    const GENZ_A: [f64; 2] = [15.51, 2.0];

    fn genz_u() -> f64 {
        2.0 * std::f64::consts::PI * 15.0 / 609.0
    }

    fn settings(abs_tol: f64, rel_tol: f64, max_evals: usize) -> CubatureSettings {
        CubatureSettings {
            abs_tol,
            rel_tol,
            max_evals,
            ..CubatureSettings::default()
        }
    }

    fn run<I: Integrand>(
        integrand: I,
        lower: &[f64],
        upper: &[f64],
        settings: CubatureSettings,
    ) -> CubatureResult {
        let mut driver = HAdaptive::new(integrand, lower, upper, settings).expect("valid problem");
        driver.run().expect("integration");
        driver.finish()
    }

    #[test]
    fn constant_is_resolved_by_root_rule() {
        for ndim in 1..=3 {
            let result = run(
                scalar_integrand(ndim, |_| 1.0),
                &vec![0.0; ndim],
                &vec![1.0; ndim],
                CubatureSettings::default(),
            );
            let expected_evals = if ndim == 1 { 15 } else { (1 << ndim) + 2 * ndim * ndim + 2 * ndim + 1 };
            assert!(result.converged);
            assert_eq!(result.status, Termination::Converged);
            assert!((result.estimate[0] - 1.0).abs() < 1e-14);
            assert!(result.error[0] < 1e-13);
            assert_eq!(result.evals_used, expected_evals);
            assert_eq!(result.regions, 1);
            assert_eq!(result.iterations, 0);
        }
    }

    #[test]
    fn genz_oscillatory_with_default_tolerances() {
        let u = genz_u();
        let exact = genz_oscillatory_exact(3.0, &GENZ_A, u);
        let result = run(
            scalar_integrand(2, move |x| genz_oscillatory(x, &GENZ_A, u)),
            &[0.0, 0.0],
            &[3.0, 3.0],
            CubatureSettings::default(),
        );
        assert!(result.converged);
        assert!((result.estimate[0] - exact).abs() < 1e-6);
        assert!((result.estimate[0] - exact).abs() <= 1e-8_f64.max(1e-8 * exact.abs()) * 10.0);
    }

    #[test]
    fn converged_results_meet_requested_tolerance() {
        let xmax = [1.5, 0.75, 2.0];
        let exact = cubature_zero_exact(&xmax);
        let result = run(
            scalar_integrand(3, cubature_zero),
            &[0.0; 3],
            &xmax,
            settings(1e-7, 1e-7, 0),
        );
        assert!(result.converged);
        assert!((result.estimate[0] - exact).abs() <= 1e-7_f64.max(1e-7 * exact.abs()));
    }

    #[test]
    fn gaussian_mapped_to_unit_cube() {
        let result = run(
            scalar_integrand(2, cubature_one),
            &[0.0; 2],
            &[1.0; 2],
            settings(1e-6, 1e-6, 0),
        );
        assert!(result.converged);
        assert!((result.estimate[0] - cubature_one_exact(2)).abs() < 1e-5);
    }

    #[test]
    fn ball_volume_in_one_and_two_dimensions() {
        for (ndim, radius) in [
            (1, 1.0),
            (1, 0.7),
            (2, 0.682_444_565_119_198_6),
            (2, 1.0),
        ] {
            let result = run(
                scalar_integrand(ndim, move |x| cubature_two(x, radius)),
                &vec![-1.0; ndim],
                &vec![1.0; ndim],
                settings(1e-4, 1e-4, 1_000_000),
            );
            let exact = cubature_two_exact(ndim, radius);
            assert!(
                (result.estimate[0] - exact).abs() < 1e-4,
                "ndim={ndim} radius={radius} estimate={} exact={exact}",
                result.estimate[0]
            );
            assert!(result.evals_used <= 1_000_000 + 2 * 33);
        }
    }

    #[test]
    #[ignore = "slow: a 3-D discontinuous integrand needs ~1e6 evaluations"]
    fn ball_volume_in_three_dimensions() {
        let result = run(
            scalar_integrand(3, |x| cubature_two(x, 1.0)),
            &[-1.0; 3],
            &[1.0; 3],
            settings(1e-4, 1e-4, 1_000_000),
        );
        let exact = cubature_two_exact(3, 1.0);
        assert!(!result.converged);
        assert!((result.estimate[0] - exact).abs() < 5e-2);
    }

    #[test]
    fn single_evaluation_budget_returns_root_estimate() {
        let u = genz_u();
        let result = run(
            scalar_integrand(2, move |x| genz_oscillatory(x, &GENZ_A, u)),
            &[0.0, 0.0],
            &[3.0, 3.0],
            settings(1e-8, 1e-8, 1),
        );
        assert!(!result.converged);
        assert_eq!(result.status, Termination::MaxEvals);
        assert_eq!(result.evals_used, 17);
        assert!(result.estimate[0].is_finite());
        assert!(result.error[0].is_finite() && result.error[0] > 0.0);
    }

    #[test]
    fn larger_budgets_never_report_larger_errors() {
        let u = genz_u();
        let mut previous = f64::INFINITY;
        for budget in [100, 1_000, 10_000, 100_000] {
            let result = run(
                scalar_integrand(2, move |x| genz_oscillatory(x, &GENZ_A, u)),
                &[0.0, 0.0],
                &[3.0, 3.0],
                settings(1e-12, 1e-12, budget),
            );
            assert_eq!(result.status, Termination::MaxEvals);
            assert!(result.error[0] <= previous, "budget={budget}");
            previous = result.error[0];
        }
        assert!(previous < 1e-5);
    }

    #[test]
    fn vector_integrand_converges_per_component() {
        let integrand = FnIntegrand::new(2, 3, |x: &[f64], out: &mut [f64]| {
            out[0] = 1.0;
            out[1] = x[0] * x[1];
            out[2] = x[0].cos();
            Ok(())
        });
        let result = run(integrand, &[0.0, 0.0], &[1.0, 1.0], CubatureSettings::default());
        assert!(result.converged);
        assert!((result.estimate[0] - 1.0).abs() < 1e-12);
        assert!((result.estimate[1] - 0.25).abs() < 1e-12);
        assert!((result.estimate[2] - 1.0f64.sin()).abs() < 1e-8);
    }

    #[test]
    fn paired_norm_integrates_complex_exponential() {
        let integrand = FnIntegrand::new(2, 2, |x: &[f64], out: &mut [f64]| {
            let phase = x[0] + x[1];
            out[0] = phase.cos();
            out[1] = phase.sin();
            Ok(())
        });
        let settings = CubatureSettings {
            norm: ErrorNorm::Paired,
            ..CubatureSettings::default()
        };
        let result = run(integrand, &[0.0, 0.0], &[1.0, 1.0], settings);
        let (s, c) = 1.0f64.sin_cos();
        assert!(result.converged);
        assert!((result.estimate[0] - (s * s - (1.0 - c) * (1.0 - c))).abs() < 1e-7);
        assert!((result.estimate[1] - 2.0 * s * (1.0 - c)).abs() < 1e-7);
    }

    #[test]
    fn nan_values_end_with_degeneracy() {
        let result = run(
            scalar_integrand(2, |x| if x[0] > 0.5 { f64::NAN } else { x[1] }),
            &[0.0, 0.0],
            &[1.0, 1.0],
            CubatureSettings::default(),
        );
        assert!(!result.converged);
        assert_eq!(result.status, Termination::NumericalDegeneracy);
        assert_eq!(result.evals_used, 17);
    }

    #[test]
    fn integrand_failure_aborts_and_keeps_state() {
        let calls = Cell::new(0usize);
        let integrand = FnIntegrand::new(2, 1, |x: &[f64], out: &mut [f64]| {
            calls.set(calls.get() + 1);
            if calls.get() > 17 {
                bail!("model diverged at {:?}", x);
            }
            out[0] = (10.0 * x[0]).sin();
            Ok(())
        });
        let mut driver = HAdaptive::new(&integrand, &[0.0, 0.0], &[1.0, 1.0], settings(1e-10, 1e-10, 0))
            .expect("root evaluation succeeds");
        let before = driver.progress();
        let err = driver.step().expect_err("second batch fails");
        assert!(matches!(err, CubatureError::Integrand(_)));
        assert!(err.to_string().contains("model diverged"));
        let after = driver.progress();
        assert_eq!(after.regions, 1);
        assert_eq!(after.evals_used, before.evals_used);
        assert_eq!(after.estimate, before.estimate);
    }

    #[test]
    fn invalid_problems_are_rejected_before_evaluation() {
        let calls = Cell::new(0usize);
        let integrand = FnIntegrand::new(2, 1, |_x: &[f64], out: &mut [f64]| {
            calls.set(calls.get() + 1);
            out[0] = 1.0;
            Ok(())
        });
        assert!(matches!(
            HAdaptive::new(&integrand, &[0.0, 1.0], &[1.0, 0.0], CubatureSettings::default()),
            Err(CubatureError::InvalidDomain { axis: 1, .. })
        ));
        assert!(matches!(
            HAdaptive::new(&integrand, &[0.0], &[1.0], CubatureSettings::default()),
            Err(CubatureError::BoundsMismatch { .. })
        ));
        assert!(matches!(
            HAdaptive::new(&integrand, &[0.0, 0.0], &[1.0, 1.0], settings(-1.0, 1e-8, 0)),
            Err(CubatureError::InvalidTolerance { .. })
        ));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn oversized_dimensions_are_rejected_before_evaluation() {
        let calls = Cell::new(0usize);
        for ndim in [20, 64, 200] {
            let integrand = FnIntegrand::new(ndim, 1, |_x: &[f64], out: &mut [f64]| {
                calls.set(calls.get() + 1);
                out[0] = 1.0;
                Ok(())
            });
            let outcome = HAdaptive::new(
                &integrand,
                &vec![0.0; ndim],
                &vec![1.0; ndim],
                settings(1e-8, 1e-8, 10),
            );
            match outcome {
                Err(CubatureError::GridTooLarge { ndim: rejected, .. }) => {
                    assert_eq!(rejected, ndim)
                }
                _ => panic!("dimension {ndim} should be rejected"),
            }
        }
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn convergence_is_confirmed_on_resummed_totals() {
        let tolerance = settings(1e-20, 0.0, 0);
        let mut state = GlobalState::new(&tolerance, 1);
        let mut coarse = Region::new(vec![0.0, 0.0], vec![1.0, 1.0], 1);
        coarse.error[0] = 1.0;
        let mut fine = Region::new(vec![1.0, 0.0], vec![2.0, 1.0], 1);
        fine.error[0] = 1e-17;
        state.push(coarse);
        state.push(fine);

        // 1.0 + 1e-17 rounds to 1.0, so removing the coarse region leaves zero.
        let popped = state.pop_worst().expect("region");
        assert_eq!(popped.error[0], 1.0);
        assert_eq!(state.error[0], 0.0);
        assert!(state.running_converged(&tolerance));
        assert!(!state.converged(&tolerance));

        state.resync();
        assert_eq!(state.error[0], 1e-17);
        assert!(!state.running_converged(&tolerance));
    }

    #[test]
    fn degenerate_axis_integrates_to_zero() {
        let result = run(
            scalar_integrand(2, |x| x[0] + x[1]),
            &[0.0, 2.0],
            &[1.0, 2.0],
            CubatureSettings::default(),
        );
        assert!(result.converged);
        assert_eq!(result.estimate[0], 0.0);
    }

    #[test]
    fn stepped_run_matches_single_shot() {
        let u = genz_u();
        let make = || scalar_integrand(2, move |x| genz_oscillatory(x, &GENZ_A, u));
        let single = run(make(), &[0.0, 0.0], &[3.0, 3.0], settings(1e-6, 1e-6, 0));

        let mut driver = HAdaptive::new(make(), &[0.0, 0.0], &[3.0, 3.0], settings(1e-6, 1e-6, 0))
            .expect("valid problem");
        let mut last_evals = 0;
        loop {
            let progress = driver.run_steps(7).expect("steps");
            assert!(progress.evals_used >= last_evals);
            last_evals = progress.evals_used;
            if progress.done {
                assert_eq!(progress.status, Some(Termination::Converged));
                break;
            }
        }
        let stepped = driver.finish();
        assert_eq!(stepped.evals_used, single.evals_used);
        assert_eq!(stepped.estimate, single.estimate);
    }

    #[test]
    fn early_finish_reports_stopped() {
        let u = genz_u();
        let mut driver = HAdaptive::new(
            scalar_integrand(2, move |x| genz_oscillatory(x, &GENZ_A, u)),
            &[0.0, 0.0],
            &[3.0, 3.0],
            CubatureSettings::default(),
        )
        .expect("valid problem");
        driver.run_steps(3).expect("steps");
        assert!(!driver.is_done());
        let result = driver.finish();
        assert_eq!(result.status, Termination::Stopped);
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.regions, 4);
    }

    #[test]
    fn unsplittable_regions_end_with_region_limit() {
        let lo = 1.0_f64;
        let hi = f64::from_bits(lo.to_bits() + 1);
        let result = run(
            scalar_integrand(1, |x| (1e6 * x[0]).sin()),
            &[lo],
            &[hi],
            settings(0.0, 0.0, 1000),
        );
        assert!(!result.converged);
        assert_eq!(result.status, Termination::RegionLimit);
        assert_eq!(result.evals_used, 15);
        assert_eq!(result.regions, 1);
        assert!(result.estimate[0].is_finite());
    }

    proptest! {
        #[test]
        fn children_sum_to_parent_for_cubics(
            coeffs in prop::collection::vec(-2.0f64..2.0, 3),
            width in 0.5f64..3.0,
        ) {
            let integrand = scalar_integrand(2, move |x: &[f64]| {
                coeffs[0] * x[0].powi(3) + coeffs[1] * x[0] * x[1] + coeffs[2] * x[1].powi(2)
            });
            let rule = HRule::for_dimension(2).expect("rule");
            let mut parent = [Region::new(vec![0.0, -1.0], vec![width, 1.0], 1)];
            rule.evaluate(&integrand, &mut parent).expect("evaluation");
            let (left, right) = parent[0].bisect().expect("splittable");
            let mut children = [left, right];
            rule.evaluate(&integrand, &mut children).expect("evaluation");
            let sum = children[0].estimate[0] + children[1].estimate[0];
            prop_assert!((sum - parent[0].estimate[0]).abs() < 1e-12 * parent[0].estimate[0].abs().max(1.0));
        }
    }
}
