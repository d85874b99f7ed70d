//! Right-preconditioned BiCGStab solver (Saad §7.4.2)

use crate::core::scalar::Scalar;
use crate::core::traits::LinearOperator;
use crate::core::wrappers::{axpy, dot, norm2, residual_in_place};
use crate::error::NoxError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, check_dims};
use crate::utils::convergence::{Convergence, SolveStats, relative};

pub struct BiCgStabSolver {
    pub conv: Convergence,
}

impl BiCgStabSolver {
    pub fn new(tol: f64, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters) }
    }
}

impl<T: Scalar> LinearSolver<T> for BiCgStabSolver {
    fn solve(
        &mut self,
        a: &dyn LinearOperator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats, NoxError> {
        let n = check_dims(a, b, x)?;
        let apply_pc = |v: &[T], out: &mut [T]| -> Result<(), NoxError> {
            match pc {
                Some(pc) => pc.apply(v, out),
                None => {
                    out.copy_from_slice(v);
                    Ok(())
                }
            }
        };
        // r0 = b - A x0
        let mut r = vec![T::zero(); n];
        a.matvec(x, &mut r)?;
        residual_in_place(b, &mut r);
        let res0 = norm2(&r);
        let mut stats = SolveStats { iterations: 0, final_residual: res0, achieved_tol: 0.0, converged: res0 == 0.0 };
        if stats.converged {
            return Ok(stats);
        }
        let r_hat = r.clone(); // shadow residual
        let (mut rho_prev, mut alpha, mut omega) = (T::one(), T::one(), T::one());
        let mut v = vec![T::zero(); n];
        let mut p = vec![T::zero(); n];
        let mut p_hat = vec![T::zero(); n];
        let mut s_hat = vec![T::zero(); n];
        let mut t = vec![T::zero(); n];

        for i in 1..=self.conv.max_iters {
            let rho = dot(&r_hat, &r);
            if rho.modulus() < f64::EPSILON * res0 * res0 {
                return Err(NoxError::Breakdown("BiCGStab (ρ = 0)"));
            }
            let beta = (rho / rho_prev) * (alpha / omega);
            // p = r + beta * (p - omega * v)
            for ((pj, rj), vj) in p.iter_mut().zip(&r).zip(&v) {
                *pj = *rj + beta * (*pj - omega * *vj);
            }
            apply_pc(&p, &mut p_hat)?;
            a.matvec(&p_hat, &mut v)?;
            let den = dot(&r_hat, &v);
            if den.modulus() == 0.0 {
                return Err(NoxError::Breakdown("BiCGStab (r̂ᴴ v = 0)"));
            }
            alpha = rho / den;
            // s = r - alpha * v, stored in r
            axpy(-alpha, &v, &mut r);
            let s_norm = norm2(&r);
            if relative(s_norm, res0) <= self.conv.tol {
                axpy(alpha, &p_hat, x);
                stats = SolveStats { iterations: i, final_residual: s_norm, achieved_tol: 0.0, converged: true };
                break;
            }
            apply_pc(&r, &mut s_hat)?;
            a.matvec(&s_hat, &mut t)?;
            let tt = dot(&t, &t);
            if tt.modulus() == 0.0 {
                return Err(NoxError::Breakdown("BiCGStab (t = 0)"));
            }
            omega = dot(&t, &r) / tt;
            axpy(alpha, &p_hat, x);
            axpy(omega, &s_hat, x);
            axpy(-omega, &t, &mut r);
            rho_prev = rho;
            let (stop, s) = self.conv.check(norm2(&r), res0, i);
            stats = s;
            if stop {
                break;
            }
        }
        stats.achieved_tol = relative(stats.final_residual, res0);
        Ok(stats)
    }
}
