//! Direct dense solve of an assembled Jacobian using Faer's full-pivoting LU.
//!
//! Only usable when the operator is an assembled [`CsrMatrix`](crate::matrix::CsrMatrix); the
//! matrix is expanded to dense column-major storage first, so this is meant for small problems and
//! for checking the iterative solvers.

use crate::core::scalar::Scalar;
use crate::core::traits::LinearOperator;
use crate::core::wrappers::{norm2, residual_in_place};
use crate::error::NoxError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, check_dims};
use crate::utils::convergence::{SolveStats, relative};

#[derive(Debug, Default)]
pub struct LuSolver;

impl LuSolver {
    pub fn new() -> Self {
        LuSolver
    }
}

impl<T: Scalar> LinearSolver<T> for LuSolver {
    /// Solve Ax = b; the preconditioner is ignored.
    fn solve(
        &mut self,
        a: &dyn LinearOperator<T>,
        _pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats, NoxError> {
        let n = check_dims(a, b, x)?;
        let csr = a.as_csr().ok_or(NoxError::Unsupported("direct LU needs an assembled Jacobian"))?;
        let mut r = vec![T::zero(); n];
        a.matvec(x, &mut r)?;
        residual_in_place(b, &mut r);
        let res0 = norm2(&r);

        x.copy_from_slice(b);
        T::dense_solve(n, &csr.to_col_major(), x)?;

        a.matvec(x, &mut r)?;
        residual_in_place(b, &mut r);
        let res = norm2(&r);
        Ok(SolveStats { iterations: 1, final_residual: res, achieved_tol: relative(res, res0), converged: true })
    }
}
