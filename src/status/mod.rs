//! Nonlinear convergence ("status") tests.
//!
//! After every Newton iteration the solver hands a [`SolverView`] to its status test. Tests report
//! a [`StatusType`]; [`Combo`] composes them with AND/OR semantics. The driver's standard tree is
//! `OR(FiniteValue, AND(NormF[, NormF rel][, NormUpdate][, NormWrms]), MaxIters)`.

use crate::config::{NormType, ScaleType};
use crate::core::Scalar;
use crate::core::wrappers::{norm1, norm2, norm_inf};
use std::fmt;

pub mod combo;
pub mod finite_value;
pub mod max_iters;
pub mod norm_f;
pub mod norm_update;
pub mod norm_wrms;

pub use combo::{Combo, ComboType};
pub use finite_value::FiniteValue;
pub use max_iters::MaxIters;
pub use norm_f::NormF;
pub use norm_update::NormUpdate;
pub use norm_wrms::NormWrms;

/// Outcome of a status test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusType {
    /// Not checked yet.
    Unevaluated,
    Unconverged,
    Converged,
    Failed,
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusType::Unevaluated => "??",
            StatusType::Unconverged => "**",
            StatusType::Converged => "Converged",
            StatusType::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Read-only snapshot of the nonlinear iteration.
#[derive(Debug, Clone, Copy)]
pub struct SolverView<'a, T> {
    /// Completed Newton steps
    pub n_iter: usize,
    pub x: &'a [T],
    /// Iterate before the last step; `None` at iteration 0
    pub x_prev: Option<&'a [T]>,
    pub f: &'a [T],
    /// Unscaled 2-norm of `f`
    pub norm_f: f64,
}

pub trait StatusTest<T: Scalar> {
    /// Evaluate the test on the current iterate and remember the result.
    fn check_status(&mut self, view: &SolverView<'_, T>) -> StatusType;
    /// Result of the last `check_status`.
    fn status(&self) -> StatusType;
    /// One-line summary (nested tests indented by `indent`).
    fn describe(&self, indent: usize) -> String;
}

/// ‖v‖ in the requested norm, optionally scaled by the length (√n for the 2-norm, n for the 1-norm).
pub fn scaled_norm<T: Scalar>(v: &[T], ntype: NormType, stype: ScaleType) -> f64 {
    let n = v.len().max(1) as f64;
    match (ntype, stype) {
        (NormType::Two, ScaleType::Unscaled) => norm2(v),
        (NormType::Two, ScaleType::Scaled) => norm2(v) / n.sqrt(),
        (NormType::One, ScaleType::Unscaled) => norm1(v),
        (NormType::One, ScaleType::Scaled) => norm1(v) / n,
        (NormType::Max, _) => norm_inf(v),
    }
}
