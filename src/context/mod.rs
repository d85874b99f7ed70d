//! Context module: solver and preconditioner factories plus the Newton driver.
//!
//! - [`ksp_context`]: `LinearSolverKind` and the `KspContext` linear solver factory.
//! - [`pc_context`]: `PreconditionerKind` and construction of library preconditioners.
//! - [`nox_context`]: `NoxSolver`, the configurable Newton driver over a problem interface.
//!
//! # References
//! - Kelley, C. T. (2003). Solving Nonlinear Equations with Newton's Method. SIAM.
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.

pub mod ksp_context;
pub use ksp_context::{KspContext, LinearSolverKind};
pub mod pc_context;
pub use pc_context::PreconditionerKind;
pub mod nox_context;
pub use nox_context::{NoxSolver, SolveState};
