//! Hyperrectangular regions and the error-ordered region heap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nalgebra::DVector;

use crate::error::CubatureError;
use crate::norm::ErrorNorm;
use crate::traits::Integrand;

/// An axis-aligned box with its cached estimate and error, one entry per output component.
#[derive(Debug, Clone)]
pub struct Region {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub estimate: DVector<f64>,
    pub error: DVector<f64>,
    /// Axis to bisect next; chosen by the rule that evaluated the region.
    pub split_dim: usize,
}

impl Region {
    /// Creates an unevaluated region. Estimate and error start at zero.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>, fdim: usize) -> Self {
        Self {
            lower,
            upper,
            estimate: DVector::zeros(fdim),
            error: DVector::zeros(fdim),
            split_dim: 0,
        }
    }

    pub fn ndim(&self) -> usize {
        self.lower.len()
    }

    pub fn center(&self, axis: usize) -> f64 {
        0.5 * self.lower[axis] + 0.5 * self.upper[axis]
    }

    pub fn half_width(&self, axis: usize) -> f64 {
        0.5 * (self.upper[axis] - self.lower[axis])
    }

    pub fn width(&self, axis: usize) -> f64 {
        self.upper[axis] - self.lower[axis]
    }

    pub fn volume(&self) -> f64 {
        (0..self.ndim()).map(|axis| self.width(axis)).product()
    }

    pub fn is_finite(&self) -> bool {
        self.estimate
            .iter()
            .chain(self.error.iter())
            .all(|v| v.is_finite())
    }

    /// Splits the region in half along `split_dim`.
    ///
    /// Returns `None` when the axis is too narrow to have a representable midpoint.
    pub fn bisect(&self) -> Option<(Region, Region)> {
        let axis = self.split_dim;
        let lo = self.lower[axis];
        let hi = self.upper[axis];
        let mid = self.center(axis);
        if !(mid > lo && mid < hi) {
            return None;
        }

        let fdim = self.estimate.len();
        let mut left = Region::new(self.lower.clone(), self.upper.clone(), fdim);
        left.upper[axis] = mid;
        let mut right = Region::new(self.lower.clone(), self.upper.clone(), fdim);
        right.lower[axis] = mid;
        Some((left, right))
    }
}

/// Checks dimensions and bounds before anything is evaluated.
pub fn validate_domain<I: Integrand + ?Sized>(
    integrand: &I,
    lower: &[f64],
    upper: &[f64],
) -> Result<(), CubatureError> {
    let ndim = integrand.ndim();
    let fdim = integrand.fdim();
    if ndim == 0 || fdim == 0 {
        return Err(CubatureError::InvalidDimension { ndim, fdim });
    }
    if lower.len() != ndim || upper.len() != ndim {
        return Err(CubatureError::BoundsMismatch {
            expected: ndim,
            lower_len: lower.len(),
            upper_len: upper.len(),
        });
    }
    for (axis, (&lo, &hi)) in lower.iter().zip(upper).enumerate() {
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(CubatureError::InvalidDomain {
                axis,
                lower: lo,
                upper: hi,
            });
        }
    }
    Ok(())
}

struct Keyed {
    key: f64,
    region: Region,
}

impl PartialEq for Keyed {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Keyed {}

impl PartialOrd for Keyed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Keyed {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.total_cmp(&other.key)
    }
}

/// Max-heap of regions keyed by their norm-combined error.
pub struct RegionHeap {
    norm: ErrorNorm,
    heap: BinaryHeap<Keyed>,
}

impl RegionHeap {
    pub fn new(norm: ErrorNorm) -> Self {
        Self {
            norm,
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, region: Region) {
        let key = self.norm.region_key(region.error.as_slice());
        self.heap.push(Keyed { key, region });
    }

    /// Removes the region with the largest error key.
    pub fn pop(&mut self) -> Option<Region> {
        self.heap.pop().map(|entry| entry.region)
    }

    pub fn peek_key(&self) -> Option<f64> {
        self.heap.peek().map(|entry| entry.key)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> + '_ {
        self.heap.iter().map(|entry| &entry.region)
    }
}
