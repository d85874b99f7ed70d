//! (Preconditioned) Conjugate Gradient per Saad §6.7 / §9.2, for Hermitian positive definite Jacobians.

use crate::core::scalar::Scalar;
use crate::core::traits::LinearOperator;
use crate::core::wrappers::{axpy, dot, norm2, residual_in_place};
use crate::error::NoxError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, check_dims};
use crate::utils::convergence::{Convergence, SolveStats, relative};

pub struct CgSolver {
    pub conv: Convergence,
}

impl CgSolver {
    pub fn new(tol: f64, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters) }
    }
}

fn precondition<T: Scalar>(pc: Option<&dyn Preconditioner<T>>, r: &[T], z: &mut [T]) -> Result<(), NoxError> {
    match pc {
        Some(pc) => pc.apply(r, z),
        None => {
            z.copy_from_slice(r);
            Ok(())
        }
    }
}

impl<T: Scalar> LinearSolver<T> for CgSolver {
    fn solve(
        &mut self,
        a: &dyn LinearOperator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats, NoxError> {
        let n = check_dims(a, b, x)?;
        let mut r = vec![T::zero(); n];
        a.matvec(x, &mut r)?;
        residual_in_place(b, &mut r);
        let res0 = norm2(&r);
        let mut stats = SolveStats { iterations: 0, final_residual: res0, achieved_tol: 0.0, converged: res0 == 0.0 };
        if stats.converged {
            return Ok(stats);
        }
        let mut z = vec![T::zero(); n];
        precondition(pc, &r, &mut z)?;
        let mut p = z.clone();
        let mut rz = dot(&r, &z);
        let mut ap = vec![T::zero(); n];

        for i in 1..=self.conv.max_iters {
            a.matvec(&p, &mut ap)?;
            let pap = dot(&p, &ap);
            if pap.modulus() == 0.0 {
                return Err(NoxError::Breakdown("CG (pᴴ A p = 0)"));
            }
            let alpha = rz / pap;
            axpy(alpha, &p, x);
            axpy(-alpha, &ap, &mut r);
            let (stop, s) = self.conv.check(norm2(&r), res0, i);
            stats = s;
            if stop {
                break;
            }
            precondition(pc, &r, &mut z)?;
            let rz_new = dot(&r, &z);
            let beta = rz_new / rz;
            for (pj, zj) in p.iter_mut().zip(&z) {
                *pj = *zj + beta * *pj;
            }
            rz = rz_new;
        }
        stats.achieved_tol = relative(stats.final_residual, res0);
        Ok(stats)
    }
}
