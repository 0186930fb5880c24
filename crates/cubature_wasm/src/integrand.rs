//! Adapts a JavaScript function into a `cubature_core` integrand.

use anyhow::{anyhow, bail, Result};
use cubature_core::Integrand;
use js_sys::{Array, Float64Array, Function};
use wasm_bindgen::{JsCast, JsValue};

/// A JS callable invoked as `f(x, ...args)`, or `f(points, npts, ...args)` when vectorized.
///
/// `x` and `points` are `Float64Array`s; the function returns a number or an
/// array-like of `fdim` (respectively `npts * fdim`) numbers.
pub struct JsIntegrand {
    func: Function,
    args: Array,
    ndim: usize,
    fdim: usize,
    vectorized: bool,
}

impl JsIntegrand {
    /// `args` may be `undefined`/`null` (no extra arguments) or any iterable.
    pub fn new(func: Function, args: &JsValue, ndim: usize, fdim: usize, vectorized: bool) -> Self {
        let args = if args.is_undefined() || args.is_null() {
            Array::new()
        } else {
            Array::from(args)
        };
        Self {
            func,
            args,
            ndim,
            fdim,
            vectorized,
        }
    }

    fn call(&self, leading: &[JsValue]) -> Result<JsValue> {
        let call_args = Array::new();
        for value in leading {
            call_args.push(value);
        }
        for value in self.args.iter() {
            call_args.push(&value);
        }
        self.func
            .apply(&JsValue::NULL, &call_args)
            .map_err(|err| anyhow!("integrand threw: {}", describe_js_error(&err)))
    }
}

impl Integrand for JsIntegrand {
    fn ndim(&self) -> usize {
        self.ndim
    }

    fn fdim(&self) -> usize {
        self.fdim
    }

    fn eval_batch(&self, points: &[f64], out: &mut [f64]) -> Result<()> {
        if self.vectorized {
            let npts = points.len() / self.ndim;
            let value = self.call(&[
                Float64Array::from(points).into(),
                JsValue::from_f64(npts as f64),
            ])?;
            return copy_values(&value, out);
        }

        for (x, row) in points
            .chunks_exact(self.ndim)
            .zip(out.chunks_exact_mut(self.fdim))
        {
            let value = self.call(&[Float64Array::from(x).into()])?;
            copy_values(&value, row)?;
        }
        Ok(())
    }
}

/// Writes a returned number or array-like into `out`, checking its length.
fn copy_values(value: &JsValue, out: &mut [f64]) -> Result<()> {
    if let Some(number) = value.as_f64() {
        check_count(1, out.len())?;
        out[0] = number;
        return Ok(());
    }
    if !value.is_object() {
        bail!("integrand must return a number or an array of numbers");
    }
    let values = Float64Array::new(value);
    check_count(values.length() as usize, out.len())?;
    values.copy_to(out);
    Ok(())
}

fn check_count(returned: usize, expected: usize) -> Result<()> {
    if returned != expected {
        bail!("integrand returned {} values, expected {}", returned, expected);
    }
    Ok(())
}

fn describe_js_error(err: &JsValue) -> String {
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_mismatch_names_both_sizes() {
        assert!(check_count(3, 3).is_ok());
        let message = check_count(2, 3).expect_err("mismatch").to_string();
        assert!(message.contains("returned 2 values, expected 3"));
    }
}
