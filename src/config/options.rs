//! Options for the Newton solver driver.
//!
//! This module provides the option records the driver is configured with before each `solve()`:
//! the search direction, the linear-solver settings used inside every Newton step, the
//! convergence criteria and which of them are active, and the output verbosity. Every record has a
//! `Default` that reproduces the stock configuration (Newton with a constant forcing term, GMRES
//! with a 50-vector Krylov space, absolute residual test at 1e-6 and a cap of 10 iterations).

use crate::context::ksp_context::LinearSolverKind;
use crate::context::pc_context::PreconditionerKind;
use crate::error::NoxError;
use crate::solver::gmres::Preconditioning;
use bitflags::bitflags;
use std::str::FromStr;

bitflags! {
    /// Which solver output is logged. Warnings and errors about configuration are always logged.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct OutputFlags: u32 {
        const ERROR                        = 0b0_0000_0001;
        const WARNING                      = 0b0_0000_0010;
        const OUTER_ITERATION              = 0b0_0000_0100;
        const INNER_ITERATION              = 0b0_0000_1000;
        const PARAMETERS                   = 0b0_0001_0000;
        const DETAILS                      = 0b0_0010_0000;
        const OUTER_ITERATION_STATUS_TEST  = 0b0_0100_0000;
        const LINEAR_SOLVER_DETAILS        = 0b0_1000_0000;
        const TEST_DETAILS                 = 0b1_0000_0000;
        const ALL = Self::ERROR.bits() | Self::WARNING.bits() | Self::OUTER_ITERATION.bits()
            | Self::INNER_ITERATION.bits() | Self::PARAMETERS.bits() | Self::DETAILS.bits()
            | Self::OUTER_ITERATION_STATUS_TEST.bits() | Self::LINEAR_SOLVER_DETAILS.bits()
            | Self::TEST_DETAILS.bits();
    }
}

impl Default for OutputFlags {
    fn default() -> Self {
        OutputFlags::ERROR
    }
}

/// Linear tolerance strategy of the full Newton direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForcingTerm {
    /// Always use the configured linear tolerance.
    Constant,
    /// Eisenstat–Walker choice 1, clamped to `[min, max]`.
    Type1 { min: f64, max: f64 },
}

/// Nonlinear search direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Direction {
    /// Jacobian (or preconditioner) rebuilt at every step.
    Newton { forcing: ForcingTerm },
    /// Jacobian reused for `max_age` steps.
    ModifiedNewton { max_age: usize },
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Newton { forcing: ForcingTerm::Constant }
    }
}

impl FromStr for Direction {
    type Err = NoxError;

    /// "Newton" or "Modified-Newton" (case-insensitive), with default parameters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newton" => Ok(Direction::default()),
            "modified-newton" | "modified newton" => Ok(Direction::ModifiedNewton { max_age: 2 }),
            _ => Err(NoxError::Unsupported("direction must be \"Newton\" or \"Modified-Newton\"")),
        }
    }
}

/// Step length selection along the Newton direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSearch {
    /// λ = 1
    FullStep,
    /// Halve λ until ‖F‖ decreases.
    Backtrack { min_step: f64, reduction: f64, max_iters: usize },
}

impl Default for LineSearch {
    fn default() -> Self {
        LineSearch::FullStep
    }
}

/// When a preconditioner is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecReusePolicy {
    /// Every time the Jacobian is recomputed.
    #[default]
    Rebuild,
    /// Only once it is `max_age_of_prec` Newton steps old.
    Reuse,
}

/// Vector norm used by the residual and update tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormType {
    #[default]
    Two,
    One,
    Max,
}

/// Whether norms are scaled by the vector length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleType {
    Unscaled,
    #[default]
    Scaled,
}

/// Settings of the linear solve inside each Newton step.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSolverOptions {
    pub kind: LinearSolverKind,
    pub max_iters: usize,
    pub tolerance: f64,
    /// Krylov subspace size (GMRES restart length)
    pub krylov_size: usize,
    pub preconditioning: Preconditioning,
    pub max_age_of_prec: usize,
    pub reuse: PrecReusePolicy,
}

impl Default for LinearSolverOptions {
    fn default() -> Self {
        Self {
            kind: LinearSolverKind::Gmres,
            max_iters: 800,
            tolerance: 1e-8,
            krylov_size: 50,
            preconditioning: Preconditioning::Right,
            max_age_of_prec: 5,
            reuse: PrecReusePolicy::Rebuild,
        }
    }
}

/// Tolerances of the nonlinear convergence tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceOptions {
    pub max_iters: usize,
    pub abs_resid: f64,
    pub rel_resid: f64,
    pub update: f64,
    pub wrms_rtol: f64,
    pub wrms_atol: f64,
    pub norm_type: NormType,
    pub scale_type: ScaleType,
}

impl Default for ConvergenceOptions {
    fn default() -> Self {
        Self {
            max_iters: 10,
            abs_resid: 1.0e-6,
            rel_resid: 1.0e-2,
            update: 1.0e-5,
            wrms_rtol: 1.0e-2,
            wrms_atol: 1.0e-8,
            norm_type: NormType::Two,
            scale_type: ScaleType::Scaled,
        }
    }
}

/// Which convergence tests join the AND group. The absolute residual test is always part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConvergenceFlags {
    pub rel_resid: bool,
    pub update: bool,
    pub wrms: bool,
}

/// Complete driver configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NoxOptions {
    pub direction: Direction,
    pub output: OutputFlags,
    pub linear: LinearSolverOptions,
    pub precond_enabled: bool,
    pub precond_kind: PreconditionerKind,
    pub line_search: LineSearch,
    pub conv: ConvergenceOptions,
    pub conv_flags: ConvergenceFlags,
}
