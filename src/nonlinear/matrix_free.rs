//! Jacobian-free Jacobian–vector products.
//!
//! J(x) v ≈ (F(x + δ v) − F(x)) / δ with δ = λ (λ + ‖x‖ / ‖v‖), the perturbation of Brown and
//! Saad. The residual evaluator is reached through a `RefCell` because Krylov solvers only hold a
//! shared reference to their operator.

use crate::core::wrappers::norm2;
use crate::core::{LinearOperator, Scalar};
use crate::error::NoxError;
use crate::problem::ResidualInterface;
use std::cell::RefCell;

/// Relative perturbation λ.
pub const LAMBDA: f64 = 1.0e-6;

pub struct MatrixFree<'a, T, R: ResidualInterface<T> + ?Sized> {
    residual: RefCell<&'a mut R>,
    x: &'a [T],
    fx: &'a [T],
    x_norm: f64,
}

impl<'a, T: Scalar, R: ResidualInterface<T> + ?Sized> MatrixFree<'a, T, R> {
    /// Linearization at `x`, where `fx = F(x)` has already been evaluated.
    pub fn new(residual: &'a mut R, x: &'a [T], fx: &'a [T]) -> Self {
        Self { residual: RefCell::new(residual), x, fx, x_norm: norm2(x) }
    }

    /// Perturbation δ for a direction of norm `v_norm`.
    pub fn perturbation(&self, v_norm: f64) -> f64 {
        LAMBDA * (LAMBDA + self.x_norm / v_norm)
    }
}

impl<T: Scalar, R: ResidualInterface<T> + ?Sized> LinearOperator<T> for MatrixFree<'_, T, R> {
    fn nrows(&self) -> usize {
        self.x.len()
    }

    fn matvec(&self, v: &[T], y: &mut [T]) -> Result<(), NoxError> {
        let n = self.x.len();
        if v.len() != n || y.len() != n {
            return Err(NoxError::DimensionMismatch { expected: n, found: v.len().min(y.len()) });
        }
        let v_norm = norm2(v);
        if v_norm == 0.0 {
            y.iter_mut().for_each(|yi| *yi = T::zero());
            return Ok(());
        }
        let delta = self.perturbation(v_norm);
        let d = T::from_real(delta);
        let perturbed: Vec<T> = self.x.iter().zip(v).map(|(&xi, &vi)| xi + d * vi).collect();
        self.residual.borrow_mut().compute_f(&perturbed, y)?;
        let inv = T::from_real(1.0 / delta);
        for (yi, &fi) in y.iter_mut().zip(self.fx) {
            *yi = (*yi - fi) * inv;
        }
        Ok(())
    }
}
