//! The `cubature_core` crate provides the adaptive integration engine behind the cubature bindings.
//! It integrates vector-valued functions over axis-aligned boxes and reports a per-component
//! error estimate alongside every value.
//!
//! Key components:
//! - **Traits**: `Integrand` (batched function capability) with closure adapters.
//! - **Rules**: Gauss-Kronrod G7/K15 (1-D), Genz-Malik 7/5 (d > 1), nested Clenshaw-Curtis (p-adaptive).
//! - **Drivers**: `HAdaptive` (region bisection) and `PAdaptive` (degree escalation), both steppable.
//! - **Integrands**: reference test functions with closed-form integrals.
pub mod error;
pub mod h_adaptive;
pub mod integrands;
pub mod norm;
pub mod p_adaptive;
pub mod region;
pub mod rules;
pub mod runner;
pub mod traits;
pub mod types;

pub use error::CubatureError;
pub use h_adaptive::{GlobalState, HAdaptive};
pub use norm::ErrorNorm;
pub use p_adaptive::PAdaptive;
pub use region::Region;
pub use runner::{integrate, CubatureRunner};
pub use traits::{FnIntegrand, Integrand, VectorizedIntegrand};
pub use types::{CubatureProgress, CubatureResult, CubatureSettings, Strategy, Termination};
