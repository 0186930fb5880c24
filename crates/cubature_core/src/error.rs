//! Error types for cubature.
//!
//! Only problems that make an integration meaningless are errors. Running out of
//! budget or hitting a non-finite value ends the integration normally and is
//! reported through [`crate::types::Termination`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CubatureError {
    /// The integrand has no inputs or no outputs.
    #[error("invalid dimensions: ndim = {ndim}, fdim = {fdim} (both must be positive)")]
    InvalidDimension { ndim: usize, fdim: usize },

    /// Bound vectors do not match the integrand dimension.
    #[error("bounds mismatch: expected {expected} coordinates, lower has {lower_len}, upper has {upper_len}")]
    BoundsMismatch {
        expected: usize,
        lower_len: usize,
        upper_len: usize,
    },

    /// A bound pair is reversed or not finite.
    #[error("invalid domain on axis {axis}: [{lower}, {upper}] must be finite with lower <= upper")]
    InvalidDomain { axis: usize, lower: f64, upper: f64 },

    /// Tolerances cannot produce a terminating integration.
    #[error("invalid tolerance: {message}")]
    InvalidTolerance { message: String },

    /// One rule application would need more integrand evaluations than the driver allows.
    #[error("dimension {ndim} needs more than {limit} evaluations per rule application")]
    GridTooLarge { ndim: usize, limit: usize },

    /// The integrand reported a failure; the integration was aborted.
    #[error("integrand evaluation failed: {0:#}")]
    Integrand(anyhow::Error),
}
