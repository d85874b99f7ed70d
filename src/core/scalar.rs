//! Scalar abstraction over real and complex degrees of freedom.
//!
//! Every vector, matrix and solver in the crate is generic over [`Scalar`]. Norms, tolerances and
//! residual statistics are always real (`f64`), regardless of whether the coefficients are real or
//! complex. Dense direct solves go through `faer`'s full-pivoting LU.

use crate::error::NoxError;
use faer::linalg::solvers::{PartialPivLu, SolveCore};
use faer::traits::ComplexField;
use faer::{Conj, Mat, MatMut};
use num_complex::Complex64;
use num_traits::Num;
use std::fmt::Debug;
use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, Neg, SubAssign};

/// A degree-of-freedom value: `f64` or `Complex64`.
pub trait Scalar:
    Num
    + Copy
    + Debug
    + Send
    + Sync
    + 'static
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Sum
{
    /// Embed a real number.
    fn from_real(r: f64) -> Self;
    /// Complex conjugate (identity for reals).
    fn conj(self) -> Self;
    /// |x|
    fn modulus(self) -> f64;
    /// |x|²
    fn modulus_sqr(self) -> f64 {
        let m = self.modulus();
        m * m
    }
    /// Real part.
    fn real(self) -> f64;
    /// True when no component is NaN or infinite.
    fn is_finite(self) -> bool;
    /// Solve the dense system `A x = b` in place, `a` stored column-major (n × n).
    fn dense_solve(n: usize, a: &[Self], b: &mut [Self]) -> Result<(), NoxError>;
}

impl Scalar for f64 {
    fn from_real(r: f64) -> Self {
        r
    }
    fn conj(self) -> Self {
        self
    }
    fn modulus(self) -> f64 {
        self.abs()
    }
    fn real(self) -> f64 {
        self
    }
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
    fn dense_solve(n: usize, a: &[Self], b: &mut [Self]) -> Result<(), NoxError> {
        faer_lu_solve(n, a, b)?;
        if b.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(NoxError::SolveError("singular matrix in dense LU".into()))
        }
    }
}

impl Scalar for Complex64 {
    fn from_real(r: f64) -> Self {
        Complex64::new(r, 0.0)
    }
    fn conj(self) -> Self {
        Complex64::new(self.re, -self.im)
    }
    fn modulus(self) -> f64 {
        self.norm()
    }
    fn modulus_sqr(self) -> f64 {
        self.norm_sqr()
    }
    fn real(self) -> f64 {
        self.re
    }
    fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
    fn dense_solve(n: usize, a: &[Self], b: &mut [Self]) -> Result<(), NoxError> {
        faer_lu_solve(n, a, b)?;
        if b.iter().all(|v| v.re.is_finite() && v.im.is_finite()) {
            Ok(())
        } else {
            Err(NoxError::SolveError("singular matrix in dense LU".into()))
        }
    }
}

fn faer_lu_solve<T: ComplexField + Copy>(n: usize, a: &[T], b: &mut [T]) -> Result<(), NoxError> {
    if a.len() != n * n {
        return Err(NoxError::DimensionMismatch { expected: n * n, found: a.len() });
    }
    if b.len() != n {
        return Err(NoxError::DimensionMismatch { expected: n, found: b.len() });
    }
    let m = Mat::from_fn(n, n, |i, j| a[j * n + i]);
    let lu = PartialPivLu::new(m.as_ref());
    let x_mat = MatMut::from_column_major_slice_mut(b, n, 1);
    lu.solve_in_place_with_conj(Conj::No, x_mat);
    Ok(())
}
