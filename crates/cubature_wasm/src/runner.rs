//! Stepped integration runner.

use crate::integrand::JsIntegrand;
use crate::options::{CubatureOptions, CubatureOutput, ProgressOutput};
use cubature_core::{CubatureProgress, CubatureRunner};
use js_sys::Function;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

/// Builds a runner from the arguments shared by `cubature` and `WasmCubatureRunner`.
pub(crate) fn build_runner(
    integrand: Function,
    ndim: u32,
    fdim: u32,
    xmin: Vec<f64>,
    xmax: Vec<f64>,
    args: JsValue,
    options: JsValue,
) -> Result<CubatureRunner<JsIntegrand>, JsValue> {
    let options = CubatureOptions::from_js(options)?;
    let settings = options.to_settings().map_err(|e| JsValue::from_str(&e))?;
    let integrand = JsIntegrand::new(
        integrand,
        &args,
        ndim as usize,
        fdim as usize,
        options.vectorized,
    );
    CubatureRunner::new(integrand, &xmin, &xmax, settings)
        .map_err(|e| JsValue::from_str(&format!("Cubature failed: {}", e)))
}

pub(crate) fn output_value(output: &CubatureOutput) -> Result<JsValue, JsValue> {
    to_value(output).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn progress_value(progress: CubatureProgress) -> Result<JsValue, JsValue> {
    to_value(&ProgressOutput::from(progress))
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub struct WasmCubatureRunner {
    state: Option<CubatureRunner<JsIntegrand>>,
}

#[wasm_bindgen]
impl WasmCubatureRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(
        integrand: Function,
        ndim: u32,
        fdim: u32,
        xmin: Vec<f64>,
        xmax: Vec<f64>,
        args: JsValue,
        options: JsValue,
    ) -> Result<WasmCubatureRunner, JsValue> {
        console_error_panic_hook::set_once();

        let runner = build_runner(integrand, ndim, fdim, xmin, xmax, args, options)?;
        Ok(WasmCubatureRunner {
            state: Some(runner),
        })
    }

    pub fn is_done(&self) -> bool {
        self.state.as_ref().map_or(true, |runner| runner.is_done())
    }

    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let runner = self
            .state
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let progress = runner
            .run_steps(batch_size as usize)
            .map_err(|e| JsValue::from_str(&format!("Cubature step failed: {}", e)))?;

        progress_value(progress)
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        let runner = self
            .state
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        progress_value(runner.progress())
    }

    /// Result so far; the status is `stopped` while the integration is still running.
    pub fn get_result(&self) -> Result<JsValue, JsValue> {
        let runner = self
            .state
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        output_value(&CubatureOutput::from(runner.result()))
    }

    /// Ends the integration and releases the integrand; later calls fail.
    pub fn cancel(&mut self) -> Result<JsValue, JsValue> {
        let runner = self
            .state
            .take()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        output_value(&CubatureOutput::from(runner.finish()))
    }
}
