//! Strategy dispatch and the one-shot `integrate` entry point.

use crate::error::CubatureError;
use crate::h_adaptive::HAdaptive;
use crate::p_adaptive::PAdaptive;
use crate::traits::Integrand;
use crate::types::{CubatureProgress, CubatureResult, CubatureSettings, Strategy};

/// A steppable integration using the driver selected by `settings.strategy`.
pub enum CubatureRunner<I: Integrand> {
    H(HAdaptive<I>),
    P(PAdaptive<I>),
}

impl<I: Integrand> CubatureRunner<I> {
    pub fn new(
        integrand: I,
        lower: &[f64],
        upper: &[f64],
        settings: CubatureSettings,
    ) -> Result<Self, CubatureError> {
        Ok(match settings.strategy {
            Strategy::HAdaptive => Self::H(HAdaptive::new(integrand, lower, upper, settings)?),
            Strategy::PAdaptive => Self::P(PAdaptive::new(integrand, lower, upper, settings)?),
        })
    }

    pub fn is_done(&self) -> bool {
        match self {
            Self::H(driver) => driver.is_done(),
            Self::P(driver) => driver.is_done(),
        }
    }

    pub fn step(&mut self) -> Result<bool, CubatureError> {
        match self {
            Self::H(driver) => driver.step(),
            Self::P(driver) => driver.step(),
        }
    }

    pub fn run_steps(&mut self, max_steps: usize) -> Result<CubatureProgress, CubatureError> {
        match self {
            Self::H(driver) => driver.run_steps(max_steps),
            Self::P(driver) => driver.run_steps(max_steps),
        }
    }

    pub fn run(&mut self) -> Result<(), CubatureError> {
        match self {
            Self::H(driver) => driver.run(),
            Self::P(driver) => driver.run(),
        }
    }

    pub fn progress(&self) -> CubatureProgress {
        match self {
            Self::H(driver) => driver.progress(),
            Self::P(driver) => driver.progress(),
        }
    }

    pub fn result(&self) -> CubatureResult {
        match self {
            Self::H(driver) => driver.result(),
            Self::P(driver) => driver.result(),
        }
    }

    pub fn finish(self) -> CubatureResult {
        match self {
            Self::H(driver) => driver.finish(),
            Self::P(driver) => driver.finish(),
        }
    }
}

/// Integrates `integrand` over the box `[lower, upper]`.
///
/// Non-convergence is not an error: check `converged` and `status` on the result.
pub fn integrate<I: Integrand + ?Sized>(
    integrand: &I,
    lower: &[f64],
    upper: &[f64],
    settings: &CubatureSettings,
) -> Result<CubatureResult, CubatureError> {
    let mut runner = CubatureRunner::new(integrand, lower, upper, *settings)?;
    runner.run()?;
    Ok(runner.finish())
}
