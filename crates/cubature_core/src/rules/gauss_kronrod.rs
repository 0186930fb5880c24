//! One-dimensional Gauss-Kronrod G7/K15 rule.

use super::CubatureRule;
use crate::region::Region;

/// Kronrod abscissae on [0, 1], descending; odd indices are shared with the 7-point Gauss rule.
const XGK: [f64; 8] = [
    0.991455371120812639206854697526329,
    0.949107912342758524526189684047851,
    0.864864423359769072789712788640926,
    0.741531185599394439863864773280788,
    0.586087235467691130294144838258730,
    0.405845151377397166906606412076961,
    0.207784955007898467600689403773245,
    0.0,
];

const WGK: [f64; 8] = [
    0.022935322010529224963732008058970,
    0.063092092629978553290700663189204,
    0.104790010322250183839876322541518,
    0.140653259715525918745189590510238,
    0.169004726639267902826583426598550,
    0.190350578064785409913256402421014,
    0.204432940075298892414161999234649,
    0.209482141084727828012999174891714,
];

/// Gauss weights for XGK[1], XGK[3], XGK[5] and the center.
const WG: [f64; 4] = [
    0.129484966168869693270611432679082,
    0.279705391489276667901467771423780,
    0.381830050505118944950369775488975,
    0.417959183673469387755102040816327,
];

/// Node layout: center first, then `(c - h x_j, c + h x_j)` for each non-zero abscissa.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussKronrod15;

impl CubatureRule for GaussKronrod15 {
    fn ndim(&self) -> usize {
        1
    }

    fn points_per_region(&self) -> usize {
        15
    }

    fn write_points(&self, region: &Region, out: &mut [f64]) {
        let center = region.center(0);
        let half = region.half_width(0);
        out[0] = center;
        for j in 0..7 {
            out[1 + 2 * j] = center - half * XGK[j];
            out[2 + 2 * j] = center + half * XGK[j];
        }
    }

    fn reduce(&self, region: &mut Region, values: &[f64]) {
        let fdim = region.estimate.len();
        let half = region.half_width(0);
        let at = |point: usize, k: usize| values[point * fdim + k];

        for k in 0..fdim {
            let fc = at(0, k);
            let mut kronrod = WGK[7] * fc;
            let mut gauss = WG[3] * fc;
            let mut abs_sum = kronrod.abs();
            for j in 0..7 {
                let (f1, f2) = (at(1 + 2 * j, k), at(2 + 2 * j, k));
                kronrod += WGK[j] * (f1 + f2);
                abs_sum += WGK[j] * (f1.abs() + f2.abs());
                if j % 2 == 1 {
                    gauss += WG[j / 2] * (f1 + f2);
                }
            }

            let mean = 0.5 * kronrod;
            let mut asc = WGK[7] * (fc - mean).abs();
            for j in 0..7 {
                asc += WGK[j] * ((at(1 + 2 * j, k) - mean).abs() + (at(2 + 2 * j, k) - mean).abs());
            }

            let (err, estimate) = quadpack_error(kronrod, gauss, abs_sum, asc, half);
            region.estimate[k] = estimate;
            region.error[k] = err;
        }
        region.split_dim = 0;
    }
}

/// QUADPACK error scaling for the raw `|K - G|` difference.
fn quadpack_error(kronrod: f64, gauss: f64, abs_sum: f64, asc: f64, half: f64) -> (f64, f64) {
    let estimate = kronrod * half;
    let mut err = ((kronrod - gauss) * half).abs();
    let asc = asc * half;
    let abs_sum = abs_sum * half;

    if asc != 0.0 && err != 0.0 {
        let scale = (200.0 * err / asc).powf(1.5);
        err = if scale < 1.0 { asc * scale } else { asc };
    }
    if abs_sum > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        err = err.max(50.0 * f64::EPSILON * abs_sum);
    }
    (err, estimate)
}
