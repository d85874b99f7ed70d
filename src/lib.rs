//! fenox: Newton–Krylov solver driver for finite-element problems over Faer
//!
//! This crate solves the nonlinear systems F(x) = 0 produced by finite-element discretizations.
//! A problem supplies residual and Jacobian assembly through [`FeProblem`]; [`NoxSolver`] drives
//! Newton or modified-Newton iterations with Krylov (GMRES, CG, BiCGStab) or direct linear solves,
//! optional ILU(0) / algebraic-multigrid / user preconditioners, a Jacobian-free mode, line searches
//! and composable convergence tests. Real (`f64`) and complex (`Complex64`) coefficients are
//! supported.

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod nonlinear;
pub mod preconditioner;
pub mod problem;
pub mod solver;
pub mod status;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use core::*;
pub use error::*;
pub use matrix::*;
pub use preconditioner::*;
pub use problem::{
    AssemblyTarget, FeProblem, JacobianInterface, PreconditionerInterface, ProblemInterface, ResidualInterface,
};
pub use solver::*;
pub use status::{StatusTest, StatusType};
pub use utils::*;

pub use num_complex::Complex64;

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
