//! Embedded cubature rules.
//!
//! Every rule pairs a high-degree estimate with an embedded lower-degree one;
//! their difference is the error estimate of a region.

pub mod clenshaw_curtis;
pub mod gauss_kronrod;
pub mod genz_malik;

pub use clenshaw_curtis::{clenshaw_curtis_weights, LevelRule, LevelRules};
pub use gauss_kronrod::GaussKronrod15;
pub use genz_malik::GenzMalik;

use crate::error::CubatureError;
use crate::region::Region;
use crate::traits::Integrand;

/// A fixed rule applied to hyperrectangular regions.
pub trait CubatureRule {
    fn ndim(&self) -> usize;

    /// Integrand evaluations per region.
    fn points_per_region(&self) -> usize;

    /// Writes the nodes of `region`, `points_per_region() * ndim()` coordinates.
    fn write_points(&self, region: &Region, out: &mut [f64]);

    /// Fills estimate, error and split axis of `region` from the values at its nodes.
    fn reduce(&self, region: &mut Region, values: &[f64]);

    /// Evaluates all `regions` with one batched integrand call.
    ///
    /// Returns the number of integrand evaluations consumed.
    fn evaluate<I: Integrand + ?Sized>(
        &self,
        integrand: &I,
        regions: &mut [Region],
    ) -> Result<usize, CubatureError> {
        let npts = self.points_per_region();
        let ndim = self.ndim();
        let fdim = integrand.fdim();

        let mut points = vec![0.0; regions.len() * npts * ndim];
        for (region, chunk) in regions.iter().zip(points.chunks_exact_mut(npts * ndim)) {
            self.write_points(region, chunk);
        }

        let mut values = vec![0.0; regions.len() * npts * fdim];
        integrand
            .eval_batch(&points, &mut values)
            .map_err(CubatureError::Integrand)?;

        for (region, chunk) in regions.iter_mut().zip(values.chunks_exact(npts * fdim)) {
            self.reduce(region, chunk);
        }
        Ok(regions.len() * npts)
    }
}

/// The rule used by the h-adaptive driver: Gauss-Kronrod in 1-D, Genz-Malik otherwise.
pub enum HRule {
    GaussKronrod(GaussKronrod15),
    GenzMalik(GenzMalik),
}

impl HRule {
    /// Fails for dimensions whose Genz-Malik rule exceeds the per-region node cap.
    pub fn for_dimension(ndim: usize) -> Result<Self, CubatureError> {
        if ndim == 1 {
            Ok(HRule::GaussKronrod(GaussKronrod15))
        } else {
            Ok(HRule::GenzMalik(GenzMalik::new(ndim)?))
        }
    }
}

impl CubatureRule for HRule {
    fn ndim(&self) -> usize {
        match self {
            HRule::GaussKronrod(rule) => rule.ndim(),
            HRule::GenzMalik(rule) => rule.ndim(),
        }
    }

    fn points_per_region(&self) -> usize {
        match self {
            HRule::GaussKronrod(rule) => rule.points_per_region(),
            HRule::GenzMalik(rule) => rule.points_per_region(),
        }
    }

    fn write_points(&self, region: &Region, out: &mut [f64]) {
        match self {
            HRule::GaussKronrod(rule) => rule.write_points(region, out),
            HRule::GenzMalik(rule) => rule.write_points(region, out),
        }
    }

    fn reduce(&self, region: &mut Region, values: &[f64]) {
        match self {
            HRule::GaussKronrod(rule) => rule.reduce(region, values),
            HRule::GenzMalik(rule) => rule.reduce(region, values),
        }
    }
}
