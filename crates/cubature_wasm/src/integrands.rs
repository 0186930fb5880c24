//! Reference integrands exported to JS, for tests and demos of the bridge.

use cubature_core::integrands as reference;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn genz_oscillatory(x: &[f64], a: &[f64], u: f64) -> f64 {
    reference::genz_oscillatory(x, a, u)
}

#[wasm_bindgen]
pub fn genz_oscillatory_exact(n: f64, a: &[f64], u: f64) -> f64 {
    reference::genz_oscillatory_exact(n, a, u)
}

#[wasm_bindgen]
pub fn cubature_zero(x: &[f64]) -> f64 {
    reference::cubature_zero(x)
}

#[wasm_bindgen]
pub fn cubature_zero_exact(xmax: &[f64]) -> f64 {
    reference::cubature_zero_exact(xmax)
}

#[wasm_bindgen]
pub fn cubature_one(x: &[f64]) -> f64 {
    reference::cubature_one(x)
}

#[wasm_bindgen]
pub fn cubature_one_exact(ndim: u32) -> f64 {
    reference::cubature_one_exact(ndim as usize)
}

#[wasm_bindgen]
pub fn cubature_two(x: &[f64], radius: f64) -> f64 {
    reference::cubature_two(x, radius)
}

#[wasm_bindgen]
pub fn cubature_two_exact(ndim: u32, radius: f64) -> f64 {
    reference::cubature_two_exact(ndim as usize, radius)
}
