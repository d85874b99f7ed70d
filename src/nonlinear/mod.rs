//! Newton–Krylov machinery: matrix-free Jacobian products, the linear system of each step, search
//! directions, line searches and the outer Newton loop.

pub mod direction;
pub mod line_search;
pub mod linear_system;
pub mod matrix_free;
pub mod solver;

pub use direction::NewtonDirection;
pub use linear_system::{LinearSystem, PrecondSource};
pub use matrix_free::MatrixFree;
pub use solver::{NewtonOutcome, NewtonSolver};
