//! Shared helpers for the linear solvers.

pub mod convergence;
