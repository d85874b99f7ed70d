//! Krylov & direct solvers for the Newton linear systems.

use crate::core::scalar::Scalar;
use crate::core::traits::LinearOperator;
use crate::error::NoxError;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;

/// Common interface for any direct or iterative solver.
pub trait LinearSolver<T: Scalar> {
    /// Solve A·x = b, writing result into `x` (which holds the initial guess on entry).
    /// Returns iteration stats (including convergence info).
    fn solve(
        &mut self,
        a: &dyn LinearOperator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats, NoxError>;
}

pub mod direct_lu;
pub use direct_lu::LuSolver;

pub mod cg;
pub use cg::CgSolver;

pub mod gmres;
pub use gmres::GmresSolver;

pub mod bicgstab;
pub use bicgstab::BiCgStabSolver;

/// Checks shared by every solver entry point.
pub(crate) fn check_dims<T>(a: &dyn LinearOperator<T>, b: &[T], x: &[T]) -> Result<usize, NoxError> {
    let n = a.nrows();
    if b.len() != n {
        return Err(NoxError::DimensionMismatch { expected: n, found: b.len() });
    }
    if x.len() != n {
        return Err(NoxError::DimensionMismatch { expected: n, found: x.len() });
    }
    Ok(n)
}

#[cfg(test)]
pub(crate) mod test_matrices {
    use crate::matrix::sparse::{CsrMatrix, PatternBuilder};
    use std::sync::Arc;

    /// Dense rows → CSR, skipping zeros off the diagonal.
    pub fn csr(rows: &[&[f64]]) -> CsrMatrix<f64> {
        let n = rows.len();
        let mut pb = PatternBuilder::new(n);
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    pb.insert(i, j);
                }
            }
        }
        let mut a = CsrMatrix::new(Arc::new(pb.build()));
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    a.add(i, j, v).unwrap();
                }
            }
        }
        a.finish();
        a
    }

    /// 4x4 non-symmetric, well-conditioned system with x_true = [1,2,3,4].
    pub fn nonsym4() -> (CsrMatrix<f64>, Vec<f64>, Vec<f64>) {
        let a = csr(&[
            &[4.0, 1.0, 0.0, 0.0],
            &[1.0, 3.0, 1.0, 0.0],
            &[0.0, 1.0, 2.0, 1.0],
            &[0.5, 0.0, 1.0, 3.0],
        ]);
        let x_true = vec![1.0, 2.0, 3.0, 4.0];
        let mut b = vec![0.0; 4];
        a.spmv(&x_true, &mut b);
        (a, b, x_true)
    }

    /// A = [[4,1,0],[1,3,1],[0,1,2]], x_true = [1,2,3]
    pub fn spd3() -> (CsrMatrix<f64>, Vec<f64>, Vec<f64>) {
        let a = csr(&[&[4.0, 1.0, 0.0], &[1.0, 3.0, 1.0], &[0.0, 1.0, 2.0]]);
        let x_true = vec![1.0, 2.0, 3.0];
        let mut b = vec![0.0; 3];
        a.spmv(&x_true, &mut b);
        (a, b, x_true)
    }
}
