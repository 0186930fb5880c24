//! Reference integrands with closed-form integrals, used to check the drivers.

use std::f64::consts::PI;

/// Genz "oscillatory" family: `cos(2πu + Σ a_i x_i)`.
pub fn genz_oscillatory(x: &[f64], a: &[f64], u: f64) -> f64 {
    let phase: f64 = x.iter().zip(a).map(|(xi, ai)| ai * xi).sum();
    (2.0 * PI * u + phase).cos()
}

/// Integral of [`genz_oscillatory`] over `[0, n]^d`, `d = a.len()`.
///
/// Every `a_i` must be non-zero.
pub fn genz_oscillatory_exact(n: f64, a: &[f64], u: f64) -> f64 {
    let sum: f64 = a.iter().sum();
    let factors: f64 = a.iter().map(|ai| 2.0 * (0.5 * ai * n).sin() / ai).product();
    (2.0 * PI * u + 0.5 * n * sum).cos() * factors
}

/// `Π cos(x_i)`.
pub fn cubature_zero(x: &[f64]) -> f64 {
    x.iter().map(|xi| xi.cos()).product()
}

/// Integral of [`cubature_zero`] over `[0, xmax]`.
pub fn cubature_zero_exact(xmax: &[f64]) -> f64 {
    xmax.iter().map(|xi| xi.sin()).product()
}

/// A product of half-line Gaussians `(2/√π) e^{-t²}` mapped onto `[0, 1]` by `t = (1 - x)/x`.
///
/// Zero on the boundary `x_i = 0`, where the mapped integrand vanishes.
pub fn cubature_one(x: &[f64]) -> f64 {
    let scale = 2.0 / PI.sqrt();
    let mut exponent = 0.0;
    let mut jacobian = 1.0;
    for &xi in x {
        if xi <= 0.0 {
            return 0.0;
        }
        let t = (1.0 - xi) / xi;
        exponent += t * t;
        jacobian *= scale / (xi * xi);
    }
    let gaussian = (-exponent).exp();
    if gaussian == 0.0 {
        0.0
    } else {
        gaussian * jacobian
    }
}

/// Integral of [`cubature_one`] over `[0, 1]^ndim`.
pub fn cubature_one_exact(_ndim: usize) -> f64 {
    1.0
}

/// Indicator of the open ball `‖x‖ < radius`.
pub fn cubature_two(x: &[f64], radius: f64) -> f64 {
    let norm_sq: f64 = x.iter().map(|xi| xi * xi).sum();
    if norm_sq < radius * radius {
        1.0
    } else {
        0.0
    }
}

/// Volume of the `ndim`-ball of `radius`; the integral of [`cubature_two`] over a box containing it.
pub fn cubature_two_exact(ndim: usize, radius: f64) -> f64 {
    // V_0 = 1, V_1 = 2, V_d = V_{d-2} 2π/d.
    let mut volumes = [1.0, 2.0];
    for d in 2..=ndim {
        volumes[d % 2] *= 2.0 * PI / d as f64;
    }
    volumes[ndim % 2] * radius.powi(ndim as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allclose(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
    }

    #[test]
    fn genz_exact_odd_dimension() {
        let expected =
            4.0 * (1056.0 + PI / 7.0).cos() * 12.0f64.sin() * 306.0f64.sin() * 738.0f64.sin() / 6273.0;
        let calculated = genz_oscillatory_exact(12.0, &[2.0, 123.0, 51.0], 1.0 / 14.0);
        assert!(allclose(calculated, expected), "{calculated} vs {expected}");
    }

    #[test]
    fn genz_exact_even_dimension() {
        let expected = (29988.0 - 7.0 * PI / 34.0).sin()
            * 51.0f64.sin()
            * (2601.0f64 / 2.0).sin()
            * (6273.0f64 / 2.0).sin()
            * 25500.0f64.sin()
            / 784125.0;
        let calculated = genz_oscillatory_exact(51.0, &[2.0, 123.0, 51.0, 1000.0], 11.0 / 17.0);
        assert!(allclose(calculated, expected), "{calculated} vs {expected}");
    }

    #[test]
    fn genz_point_value() {
        let value = genz_oscillatory(&[17.0, 201.0], &[41.0, 1.0 / 11.0], 1.0 / 51.0);
        let expected = (7868.0 / 11.0 + 2.0 * PI / 51.0).cos();
        assert!(allclose(value, expected));
    }

    #[test]
    fn cosine_product_exact_values() {
        assert!(allclose(cubature_zero_exact(&[0.0]), 0.0));
        assert!(allclose(cubature_zero_exact(&[PI / 2.0]), 1.0));
        assert!(allclose(cubature_zero_exact(&[0.0; 3]), 0.0));
        assert!(allclose(cubature_zero_exact(&[PI / 2.0; 3]), 1.0));
        assert!(allclose(cubature_zero_exact(&[PI / 2.0; 4]), 1.0));
        assert!(allclose(cubature_zero(&[0.0, PI]), -1.0));
    }

    #[test]
    fn mapped_gaussian_at_unit_corner() {
        let expected = (2.0 / PI.sqrt()).powi(5);
        assert!(allclose(cubature_one(&[1.0; 5]), expected));
        assert_eq!(cubature_one(&[0.0, 0.5, 0.5]), 0.0);
        assert_eq!(cubature_one(&[1e-3, 1.0]), 0.0);
        assert_eq!(cubature_one_exact(3), 1.0);
    }

    #[test]
    fn ball_volumes() {
        assert!(allclose(cubature_two_exact(1, 1.0), 2.0));
        assert!(allclose(cubature_two_exact(2, 1.0), PI));
        assert!(allclose(cubature_two_exact(3, 1.0), 4.0 / 3.0 * PI));
        assert!(allclose(cubature_two_exact(4, 1.0), PI * PI / 2.0));
        assert!(allclose(cubature_two_exact(2, 0.5), PI / 4.0));
    }

    #[test]
    fn ball_indicator_is_open() {
        assert_eq!(cubature_two(&[0.6, 0.8], 1.0), 0.0);
        assert_eq!(cubature_two(&[0.6, 0.7], 1.0), 1.0);
        assert_eq!(cubature_two(&[-0.5], 0.7), 1.0);
    }
}
