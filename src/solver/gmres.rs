//! Generalized Minimal Residual (GMRES) solver with fixed restart (Saad §6.4)
//!
//! Restarted GMRES for the (generally nonsymmetric) Newton systems J d = −F. The Krylov subspace
//! size is the restart length. Works for real and complex scalars: the Arnoldi process uses the
//! Hermitian inner product and the least-squares problem is reduced with complex Givens rotations
//! (real cosine, scalar sine).
//!
//! # Features
//! - Supports left, right, or no preconditioning
//! - Double (iterative) Gram-Schmidt orthogonalization for numerical stability
//! - Happy breakdown detection for early termination
//! - Convergence is decided on the true residual ‖b − A x‖ after every cycle
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.4
//! - https://en.wikipedia.org/wiki/Generalized_minimal_residual_method

use crate::core::scalar::Scalar;
use crate::core::traits::LinearOperator;
use crate::core::wrappers::{axpy, dot, norm2, residual_in_place};
use crate::error::NoxError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, check_dims};
use crate::utils::convergence::{Convergence, SolveStats, relative};

/// Preconditioning mode for GMRES (none, left, or right)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Preconditioning {
    None,
    Left,
    Right,
}

/// GMRES solver struct with restart and preconditioning options.
pub struct GmresSolver {
    /// Number of Arnoldi vectors before restart
    pub restart: usize,
    /// Convergence criteria (tolerance and max iterations)
    pub conv: Convergence,
    /// Preconditioning mode
    pub preconditioning: Preconditioning,
}

const EPSILON: f64 = 1e-14;

impl GmresSolver {
    /// Create a new GMRES solver with restart, tolerance, and max iterations.
    pub fn new(restart: usize, tol: f64, max_iters: usize) -> Self {
        Self {
            restart: restart.max(1),
            conv: Convergence::new(tol, max_iters),
            preconditioning: Preconditioning::Right,
        }
    }

    /// Set the preconditioning mode (left, right, or none).
    pub fn with_preconditioning(mut self, mode: Preconditioning) -> Self {
        self.preconditioning = mode;
        self
    }

    /// Rotation (c, s) with [c s; −s̄ c] [a; b] = [r; 0].
    fn givens<T: Scalar>(a: T, b: T) -> (f64, T, T) {
        let (am, bm) = (a.modulus(), b.modulus());
        if bm == 0.0 {
            return (1.0, T::zero(), a);
        }
        if am == 0.0 {
            return (0.0, T::one(), b);
        }
        let r = am.hypot(bm);
        let alpha = a / T::from_real(am);
        (am / r, alpha * b.conj() / T::from_real(r), alpha * T::from_real(r))
    }

    fn rotate<T: Scalar>(c: f64, s: T, x: T, y: T) -> (T, T) {
        let c = T::from_real(c);
        (c * x + s * y, c * y - s.conj() * x)
    }

    /// Solve upper-triangular system Hy = g for y, with zero-pivot protection.
    fn back_substitution<T: Scalar>(h: &[Vec<T>], g: &[T], m: usize) -> Vec<T> {
        let mut y = vec![T::zero(); m];
        for i in (0..m).rev() {
            let mut acc = g[i];
            for j in (i + 1)..m {
                acc -= h[i][j] * y[j];
            }
            y[i] = if h[i][i].modulus() > EPSILON { acc / h[i][i] } else { T::zero() };
        }
        y
    }

    /// w = op(v), recording M⁻¹ v for right preconditioning.
    fn apply_op<T: Scalar>(
        &self,
        a: &dyn LinearOperator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        v: &[T],
        w: &mut [T],
        z_basis: &mut Vec<Vec<T>>,
    ) -> Result<(), NoxError> {
        let n = v.len();
        match (self.preconditioning, pc) {
            (Preconditioning::Right, Some(pc)) => {
                let mut z = vec![T::zero(); n];
                pc.apply(v, &mut z)?;
                a.matvec(&z, w)?;
                z_basis.push(z);
            }
            (Preconditioning::Left, Some(pc)) => {
                let mut t = vec![T::zero(); n];
                a.matvec(v, &mut t)?;
                pc.apply(&t, w)?;
            }
            _ => a.matvec(v, w)?,
        }
        Ok(())
    }
}

impl<T: Scalar> LinearSolver<T> for GmresSolver {
    /// Solve the linear system Ax = b using restarted GMRES.
    ///
    /// # Returns
    /// * `Ok(SolveStats)` if converged or max iterations reached
    /// * `Err(NoxError)` if the operator or preconditioner fails
    fn solve(
        &mut self,
        a: &dyn LinearOperator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats, NoxError> {
        let n = check_dims(a, b, x)?;
        let left = self.preconditioning == Preconditioning::Left && pc.is_some();
        let mut r = vec![T::zero(); n];
        a.matvec(x, &mut r)?;
        residual_in_place(b, &mut r);
        let res0 = norm2(&r);
        let mut stats = SolveStats { iterations: 0, final_residual: res0, achieved_tol: relative(res0, res0), converged: res0 == 0.0 };
        if stats.converged {
            return Ok(stats);
        }

        let mut iteration = 0;
        let mut inner_ref = None;
        while iteration < self.conv.max_iters {
            // Starting vector of this cycle
            let mut r_hat = r.clone();
            if let (true, Some(pc)) = (left, pc) {
                pc.apply(&r, &mut r_hat)?;
            }
            let beta = norm2(&r_hat);
            if beta == 0.0 {
                break;
            }
            let beta0 = *inner_ref.get_or_insert(beta);
            let m = self.restart.min(self.conv.max_iters - iteration);
            let mut v_basis: Vec<Vec<T>> = Vec::with_capacity(m + 1);
            let mut z_basis: Vec<Vec<T>> = Vec::with_capacity(m);
            v_basis.push(r_hat.iter().map(|&ri| ri / T::from_real(beta)).collect());

            let mut h = vec![vec![T::zero(); m]; m + 1];
            let mut g = vec![T::zero(); m + 1];
            g[0] = T::from_real(beta);
            let mut cs = vec![0.0; m];
            let mut sn = vec![T::zero(); m];
            let mut k = 0;
            for j in 0..m {
                iteration += 1;
                let mut w = vec![T::zero(); n];
                self.apply_op(a, pc, &v_basis[j], &mut w, &mut z_basis)?;
                // Modified Gram-Schmidt, applied twice
                for _ in 0..2 {
                    for i in 0..=j {
                        let hij = dot(&v_basis[i], &w);
                        h[i][j] += hij;
                        axpy(-hij, &v_basis[i], &mut w);
                    }
                }
                let h_next = norm2(&w);
                h[j + 1][j] = T::from_real(h_next);
                for i in 0..j {
                    let (hi, hi1) = Self::rotate(cs[i], sn[i], h[i][j], h[i + 1][j]);
                    h[i][j] = hi;
                    h[i + 1][j] = hi1;
                }
                let (c, s, rr) = Self::givens(h[j][j], h[j + 1][j]);
                cs[j] = c;
                sn[j] = s;
                h[j][j] = rr;
                h[j + 1][j] = T::zero();
                let (gj, gj1) = Self::rotate(c, s, g[j], g[j + 1]);
                g[j] = gj;
                g[j + 1] = gj1;
                k = j + 1;

                let happy_breakdown = h_next < EPSILON * beta;
                let (stop, _) = self.conv.check(g[j + 1].modulus(), beta0, iteration);
                if stop || happy_breakdown {
                    break;
                }
                v_basis.push(w.iter().map(|&wi| wi / T::from_real(h_next)).collect());
            }

            let y = Self::back_substitution(&h, &g, k);
            let basis = if z_basis.is_empty() { &v_basis } else { &z_basis };
            for (yj, dir) in y.iter().zip(basis) {
                axpy(*yj, dir, x);
            }

            a.matvec(x, &mut r)?;
            residual_in_place(b, &mut r);
            let res = norm2(&r);
            stats = SolveStats {
                iterations: iteration,
                final_residual: res,
                achieved_tol: relative(res, res0),
                converged: relative(res, res0) <= self.conv.tol,
            };
            if stats.converged {
                break;
            }
        }
        Ok(stats)
    }
}
