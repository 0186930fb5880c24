use anyhow::Result;

/// A vector-valued function `R^ndim -> R^fdim` that can be evaluated in batches.
///
/// Points arrive row-major: `npts` rows of `ndim()` coordinates. Values must be
/// written row-major into `out`: `npts` rows of `fdim()` components.
/// Implementations must be pure; the error estimates assume repeated calls at
/// the same point return the same value.
pub trait Integrand {
    /// Number of input coordinates.
    fn ndim(&self) -> usize;

    /// Number of output components.
    fn fdim(&self) -> usize;

    /// Evaluates every point of the batch.
    fn eval_batch(&self, points: &[f64], out: &mut [f64]) -> Result<()>;
}

impl<I: Integrand + ?Sized> Integrand for &I {
    fn ndim(&self) -> usize {
        (**self).ndim()
    }

    fn fdim(&self) -> usize {
        (**self).fdim()
    }

    fn eval_batch(&self, points: &[f64], out: &mut [f64]) -> Result<()> {
        (**self).eval_batch(points, out)
    }
}

impl<I: Integrand + ?Sized> Integrand for Box<I> {
    fn ndim(&self) -> usize {
        (**self).ndim()
    }

    fn fdim(&self) -> usize {
        (**self).fdim()
    }

    fn eval_batch(&self, points: &[f64], out: &mut [f64]) -> Result<()> {
        (**self).eval_batch(points, out)
    }
}

/// Point-wise integrand: the closure receives one point and writes its `fdim` values.
///
/// Extra arguments are whatever the closure captures.
pub struct FnIntegrand<F> {
    ndim: usize,
    fdim: usize,
    func: F,
}

impl<F> FnIntegrand<F>
where
    F: Fn(&[f64], &mut [f64]) -> Result<()>,
{
    pub fn new(ndim: usize, fdim: usize, func: F) -> Self {
        Self { ndim, fdim, func }
    }
}

impl<F> Integrand for FnIntegrand<F>
where
    F: Fn(&[f64], &mut [f64]) -> Result<()>,
{
    fn ndim(&self) -> usize {
        self.ndim
    }

    fn fdim(&self) -> usize {
        self.fdim
    }

    fn eval_batch(&self, points: &[f64], out: &mut [f64]) -> Result<()> {
        for (x, values) in points
            .chunks_exact(self.ndim)
            .zip(out.chunks_exact_mut(self.fdim))
        {
            (self.func)(x, values)?;
        }
        Ok(())
    }
}

/// Wraps an infallible scalar function of one point.
pub fn scalar_integrand<G>(
    ndim: usize,
    func: G,
) -> FnIntegrand<impl Fn(&[f64], &mut [f64]) -> Result<()>>
where
    G: Fn(&[f64]) -> f64,
{
    FnIntegrand::new(ndim, 1, move |x: &[f64], out: &mut [f64]| {
        out[0] = func(x);
        Ok(())
    })
}

/// Vectorized integrand: the closure receives the whole batch and the point count.
pub struct VectorizedIntegrand<F> {
    ndim: usize,
    fdim: usize,
    func: F,
}

impl<F> VectorizedIntegrand<F>
where
    F: Fn(&[f64], usize, &mut [f64]) -> Result<()>,
{
    pub fn new(ndim: usize, fdim: usize, func: F) -> Self {
        Self { ndim, fdim, func }
    }
}

impl<F> Integrand for VectorizedIntegrand<F>
where
    F: Fn(&[f64], usize, &mut [f64]) -> Result<()>,
{
    fn ndim(&self) -> usize {
        self.ndim
    }

    fn fdim(&self) -> usize {
        self.fdim
    }

    fn eval_batch(&self, points: &[f64], out: &mut [f64]) -> Result<()> {
        let npts = points.len() / self.ndim;
        (self.func)(points, npts, out)
    }
}
