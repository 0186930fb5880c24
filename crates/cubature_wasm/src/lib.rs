//! WASM bridge for `cubature_core`.
//!
//! `cubature` mirrors the Python binding: it takes a JS integrand, the
//! dimensions, the bounds, extra arguments and an option object, and
//! returns `{ value, error, converged, evalsUsed, status, regions, iterations }`.

use js_sys::Function;
use wasm_bindgen::prelude::*;

mod integrand;
mod integrands;
mod options;
mod runner;

pub use integrand::JsIntegrand;
pub use integrands::*;
pub use options::{CubatureOptions, CubatureOutput, ProgressOutput};
pub use runner::WasmCubatureRunner;

use runner::{build_runner, output_value};

/// Integrates `integrand` over `[xmin, xmax]` to completion.
///
/// `args` (array or `undefined`) is appended to every call; `options` may
/// set `adaptive` (`"h"` or `"p"`), `abserr`, `relerr`, `maxEval`, `norm`
/// and `vectorized`.
#[wasm_bindgen]
pub fn cubature(
    integrand: Function,
    ndim: u32,
    fdim: u32,
    xmin: Vec<f64>,
    xmax: Vec<f64>,
    args: JsValue,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let mut runner = build_runner(integrand, ndim, fdim, xmin, xmax, args, options)?;
    runner
        .run()
        .map_err(|e| JsValue::from_str(&format!("Cubature failed: {}", e)))?;
    output_value(&CubatureOutput::from(runner.finish()))
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::cubature;
    use js_sys::{Array, Function, Object, Reflect};
    use serde::Deserialize;
    use serde_wasm_bindgen::from_value;
    use wasm_bindgen::JsValue;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Output {
        value: Vec<f64>,
        error: Vec<f64>,
        converged: bool,
        evals_used: usize,
    }

    fn options(pairs: &[(&str, JsValue)]) -> JsValue {
        let object = Object::new();
        for (key, value) in pairs {
            Reflect::set(&object, &JsValue::from_str(key), value).expect("set option");
        }
        object.into()
    }

    #[wasm_bindgen_test]
    fn genz_oscillatory_with_extra_arguments() {
        let func = Function::new_with_args(
            "x, a, u",
            "return Math.cos(2 * Math.PI * u + a[0] * x[0] + a[1] * x[1]);",
        );
        let a = Array::of2(&JsValue::from_f64(15.51), &JsValue::from_f64(2.0));
        let u = 2.0 * std::f64::consts::PI * 15.0 / 609.0;
        let args = Array::of2(&a, &JsValue::from_f64(u));

        let value = cubature(
            func,
            2,
            1,
            vec![0.0, 0.0],
            vec![3.0, 3.0],
            args.into(),
            options(&[("adaptive", JsValue::from_str("h"))]),
        )
        .expect("cubature");
        let output: Output = from_value(value).expect("output");
        let exact = cubature_core::integrands::genz_oscillatory_exact(3.0, &[15.51, 2.0], u);
        assert!(output.converged);
        assert!((output.value[0] - exact).abs() < 1e-6);
        assert!(output.error[0] <= 1e-8);
    }

    #[wasm_bindgen_test]
    fn vectorized_integrand_gets_whole_batch() {
        let func = Function::new_with_args(
            "points, npts",
            "const out = new Float64Array(npts);\
             for (let i = 0; i < npts; i++) { out[i] = points[2 * i] + points[2 * i + 1]; }\
             return out;",
        );
        let value = cubature(
            func,
            2,
            1,
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            JsValue::UNDEFINED,
            options(&[("vectorized", JsValue::TRUE), ("adaptive", JsValue::from_str("p"))]),
        )
        .expect("cubature");
        let output: Output = from_value(value).expect("output");
        assert!(output.converged);
        assert!((output.value[0] - 1.0).abs() < 1e-14);
        assert_eq!(output.evals_used, 9);
    }

    #[wasm_bindgen_test]
    fn wrong_output_length_is_an_error() {
        let func = Function::new_with_args("x", "return [x[0], x[0]];");
        let err = cubature(
            func,
            1,
            1,
            vec![0.0],
            vec![1.0],
            JsValue::UNDEFINED,
            JsValue::UNDEFINED,
        )
        .expect_err("length mismatch");
        let message = err.as_string().unwrap_or_default();
        assert!(message.contains("returned 2 values, expected 1"));
    }

    #[wasm_bindgen_test]
    fn thrown_exception_is_reported() {
        let func = Function::new_with_args("x", "throw new Error('bad input');");
        let err = cubature(
            func,
            1,
            1,
            vec![0.0],
            vec![1.0],
            JsValue::UNDEFINED,
            JsValue::UNDEFINED,
        )
        .expect_err("exception");
        assert!(err.as_string().unwrap_or_default().contains("bad input"));
    }

    #[wasm_bindgen_test]
    fn unknown_strategy_is_rejected() {
        let func = Function::new_with_args("x", "return 1;");
        let err = cubature(
            func,
            1,
            1,
            vec![0.0],
            vec![1.0],
            JsValue::UNDEFINED,
            options(&[("adaptive", JsValue::from_str("x"))]),
        )
        .expect_err("unknown strategy");
        assert!(err.as_string().unwrap_or_default().contains("'x'"));
    }
}
