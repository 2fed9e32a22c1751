//! Single-precision special functions.
//!
//! These are the host twins of the WGSL kernels in `shaders::special`: same
//! branch structure, same constants, same evaluation order. The in-process
//! backend runs them directly and the GPU tests use them as the reference.

pub mod constants;
pub mod digamma;
pub mod gamma;
pub mod polygamma;
pub mod zeta;

pub use digamma::{calc_digamma_positive_domain, digamma, DigammaDomain};
pub use gamma::{gamma, log_gamma, sin_pi, stirling_log_gamma};
pub use polygamma::{calc_polygamma, calc_trigamma, polygamma};
pub use zeta::calc_zeta;

use crate::types::KernelFunction;

/// Evaluate one lane of `function`. `order` is only read by `Polygamma`.
pub fn evaluate(function: KernelFunction, x: f32, order: i64) -> f32 {
    match function {
        KernelFunction::Lgamma => log_gamma(x),
        KernelFunction::Digamma => digamma(x),
        KernelFunction::Trigamma => calc_trigamma(x),
        KernelFunction::Polygamma => calc_polygamma(order, x),
    }
}
