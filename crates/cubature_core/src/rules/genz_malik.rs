//! Genz-Malik degree 7 rule with an embedded degree 5 rule, for `ndim >= 2`.
//!
//! Nodes per region: `2^d + 2d^2 + 2d + 1`. The fourth differences along each
//! axis pick the axis to bisect next.

use super::CubatureRule;
use crate::error::CubatureError;
use crate::region::Region;

// Generator radii, relative to the half-widths.
const LAMBDA2: f64 = 0.358_568_582_800_318_1; // sqrt(9/70)
const LAMBDA4: f64 = 0.948_683_298_050_513_8; // sqrt(9/10)
const LAMBDA5: f64 = 0.688_247_201_611_685_3; // sqrt(9/19)

/// `LAMBDA2^2 / LAMBDA4^2`, cancels the second difference in the split criterion.
const DIFF_RATIO: f64 = 1.0 / 7.0;

/// Relative slack under which two axes count as equally rough.
const TIE_TOLERANCE: f64 = 1e-10;

/// Largest node count of one region; reached between 19 and 20 dimensions.
pub const MAX_POINTS_PER_REGION: usize = 1 << 20;

/// `2^d + 2d^2 + 2d + 1`, or `None` when it does not fit in a `usize`.
pub fn point_count(ndim: usize) -> Option<usize> {
    let corners = 1usize.checked_shl(u32::try_from(ndim).ok()?)?;
    let pairs = ndim.checked_mul(ndim)?.checked_mul(2)?;
    corners
        .checked_add(pairs)?
        .checked_add(ndim.checked_mul(2)?)?
        .checked_add(1)
}

#[derive(Debug, Clone)]
pub struct GenzMalik {
    ndim: usize,
    npts: usize,
    /// Degree 7 weights for the center, λ2, λ4, λ4-pair and λ5-corner groups.
    weights7: [f64; 5],
    /// Degree 5 weights; the corners do not take part.
    weights5: [f64; 4],
}

impl GenzMalik {
    /// Fails when a region would need more than [`MAX_POINTS_PER_REGION`] nodes.
    pub fn new(ndim: usize) -> Result<Self, CubatureError> {
        let npts = point_count(ndim)
            .filter(|&n| n <= MAX_POINTS_PER_REGION)
            .ok_or(CubatureError::GridTooLarge {
                ndim,
                limit: MAX_POINTS_PER_REGION,
            })?;
        let d = ndim as f64;
        let corners = 1usize << ndim;
        let weights7 = [
            (12824.0 - 9120.0 * d + 400.0 * d * d) / 19683.0,
            980.0 / 6561.0,
            (1820.0 - 400.0 * d) / 19683.0,
            200.0 / 19683.0,
            6859.0 / 19683.0 / corners as f64,
        ];
        let weights5 = [
            (729.0 - 950.0 * d + 50.0 * d * d) / 729.0,
            245.0 / 486.0,
            (265.0 - 100.0 * d) / 1458.0,
            25.0 / 729.0,
        ];
        Ok(Self {
            ndim,
            npts,
            weights7,
            weights5,
        })
    }

    fn pair_offset(&self) -> usize {
        1 + 4 * self.ndim
    }

    fn corner_offset(&self) -> usize {
        self.pair_offset() + 2 * self.ndim * (self.ndim - 1)
    }
}

/// Copies `center` into the next free node slot and returns it for offsetting.
fn next_point<'a>(out: &'a mut [f64], cursor: &mut usize, center: &[f64]) -> &'a mut [f64] {
    let d = center.len();
    let point = &mut out[*cursor * d..(*cursor + 1) * d];
    point.copy_from_slice(center);
    *cursor += 1;
    point
}

impl CubatureRule for GenzMalik {
    fn ndim(&self) -> usize {
        self.ndim
    }

    fn points_per_region(&self) -> usize {
        self.npts
    }

    fn write_points(&self, region: &Region, out: &mut [f64]) {
        let d = self.ndim;
        let center: Vec<f64> = (0..d).map(|i| region.center(i)).collect();
        let half: Vec<f64> = (0..d).map(|i| region.half_width(i)).collect();
        let mut cursor = 0;

        next_point(out, &mut cursor, &center);

        for i in 0..d {
            for offset in [-LAMBDA2, LAMBDA2, -LAMBDA4, LAMBDA4] {
                next_point(out, &mut cursor, &center)[i] += offset * half[i];
            }
        }

        for i in 0..d {
            for j in (i + 1)..d {
                for (si, sj) in [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)] {
                    let point = next_point(out, &mut cursor, &center);
                    point[i] += si * LAMBDA4 * half[i];
                    point[j] += sj * LAMBDA4 * half[j];
                }
            }
        }

        for mask in 0..(1usize << d) {
            let point = next_point(out, &mut cursor, &center);
            for i in 0..d {
                let sign = if (mask >> i) & 1 == 1 { 1.0 } else { -1.0 };
                point[i] += sign * LAMBDA5 * half[i];
            }
        }
        debug_assert_eq!(cursor, self.npts);
    }

    fn reduce(&self, region: &mut Region, values: &[f64]) {
        let d = self.ndim;
        let fdim = region.estimate.len();
        let volume = region.volume();
        let at = |point: usize, k: usize| values[point * fdim + k];
        let pairs = self.pair_offset()..self.corner_offset();
        let corners = self.corner_offset()..self.npts;

        let mut diff = vec![0.0; d];
        for k in 0..fdim {
            let f0 = at(0, k);
            let mut s2 = 0.0;
            let mut s3 = 0.0;
            for (i, axis_diff) in diff.iter_mut().enumerate() {
                let base = 1 + 4 * i;
                let inner = at(base, k) + at(base + 1, k);
                let outer = at(base + 2, k) + at(base + 3, k);
                s2 += inner;
                s3 += outer;
                *axis_diff += (inner - 2.0 * f0 - DIFF_RATIO * (outer - 2.0 * f0)).abs();
            }
            let s4: f64 = pairs.clone().map(|p| at(p, k)).sum();
            let s5: f64 = corners.clone().map(|p| at(p, k)).sum();

            let [w1, w2, w3, w4, w5] = self.weights7;
            let [e1, e2, e3, e4] = self.weights5;
            let r7 = volume * (w1 * f0 + w2 * s2 + w3 * s3 + w4 * s4 + w5 * s5);
            let r5 = volume * (e1 * f0 + e2 * s2 + e3 * s3 + e4 * s4);
            region.estimate[k] = r7;
            region.error[k] = (r7 - r5).abs();
        }

        region.split_dim = roughest_axis(region, &diff);
    }
}

/// Axis with the largest fourth difference; near ties go to the widest axis.
fn roughest_axis(region: &Region, diff: &[f64]) -> usize {
    let mut best = 0;
    let mut best_diff = 0.0_f64;
    for (axis, &value) in diff.iter().enumerate() {
        let delta = value - best_diff;
        let slack = TIE_TOLERANCE * best_diff.max(value);
        if delta > slack {
            best = axis;
            best_diff = value;
        } else if delta.abs() <= slack && region.width(axis) > region.width(best) {
            best = axis;
        }
    }
    best
}
