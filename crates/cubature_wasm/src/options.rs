//! Option parsing and result payloads for the JS-facing API.

use cubature_core::{
    CubatureProgress, CubatureResult, CubatureSettings, ErrorNorm, Strategy, Termination,
};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::from_value;
use wasm_bindgen::JsValue;

/// Option bag accepted by `cubature` and `WasmCubatureRunner`.
///
/// Field names follow the Python binding (`abserr`, `relerr`, `maxEval`, `adaptive`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CubatureOptions {
    /// `"h"` (region bisection) or `"p"` (degree escalation).
    pub adaptive: String,
    pub abserr: f64,
    pub relerr: f64,
    pub max_eval: usize,
    pub norm: ErrorNorm,
    /// Call the integrand once per batch as `f(points, npts, ...args)`.
    pub vectorized: bool,
}

impl Default for CubatureOptions {
    fn default() -> Self {
        let settings = CubatureSettings::default();
        Self {
            adaptive: "h".to_string(),
            abserr: settings.abs_tol,
            relerr: settings.rel_tol,
            max_eval: settings.max_evals,
            norm: settings.norm,
            vectorized: false,
        }
    }
}

impl CubatureOptions {
    /// Reads the option object; `undefined` and `null` mean all defaults.
    pub fn from_js(value: JsValue) -> Result<Self, JsValue> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        from_value(value).map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))
    }

    pub fn to_settings(&self) -> Result<CubatureSettings, String> {
        let strategy = match self.adaptive.as_str() {
            "h" => Strategy::HAdaptive,
            "p" => Strategy::PAdaptive,
            other => {
                return Err(format!(
                    "Unknown adaptive strategy '{}'; expected 'h' or 'p'",
                    other
                ))
            }
        };
        let settings = CubatureSettings {
            abs_tol: self.abserr,
            rel_tol: self.relerr,
            max_evals: self.max_eval,
            norm: self.norm,
            strategy,
        };
        settings.validate().map_err(|e| e.to_string())?;
        Ok(settings)
    }
}

/// Result payload returned to JS.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CubatureOutput {
    pub value: Vec<f64>,
    pub error: Vec<f64>,
    pub converged: bool,
    pub evals_used: usize,
    pub status: Termination,
    pub regions: usize,
    pub iterations: usize,
}

impl From<CubatureResult> for CubatureOutput {
    fn from(result: CubatureResult) -> Self {
        Self {
            value: result.estimate,
            error: result.error,
            converged: result.converged,
            evals_used: result.evals_used,
            status: result.status,
            regions: result.regions,
            iterations: result.iterations,
        }
    }
}

/// Progress payload returned to JS between steps, keyed like [`CubatureOutput`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOutput {
    pub done: bool,
    pub status: Option<Termination>,
    pub value: Vec<f64>,
    pub error: Vec<f64>,
    pub evals_used: usize,
    pub max_evals: usize,
    pub regions: usize,
    pub iterations: usize,
}

impl From<CubatureProgress> for ProgressOutput {
    fn from(progress: CubatureProgress) -> Self {
        Self {
            done: progress.done,
            status: progress.status,
            value: progress.estimate,
            error: progress.error,
            evals_used: progress.evals_used,
            max_evals: progress.max_evals,
            regions: progress.regions,
            iterations: progress.iterations,
        }
    }
}
