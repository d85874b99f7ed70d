//! Vector kernels over `Scalar` slices.
//!
//! Inner products use the Hermitian convention `dot(x, y) = Σ conj(xᵢ) yᵢ`, so the same Krylov code
//! runs on real and complex coefficient vectors. With the `rayon` feature enabled the reductions run
//! on the global thread pool; element-wise updates stay serial.

use crate::core::scalar::Scalar;

/// Hermitian inner product `xᴴ y`.
pub fn dot<T: Scalar>(x: &[T], y: &[T]) -> T {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        x.par_iter()
            .zip(y.par_iter())
            .map(|(xi, yi)| xi.conj() * *yi)
            .reduce(T::zero, |acc, v| acc + v)
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter()
            .zip(y.iter())
            .map(|(xi, yi)| xi.conj() * *yi)
            .fold(T::zero(), |acc, v| acc + v)
    }
}

/// Euclidean norm `‖x‖₂`.
pub fn norm2<T: Scalar>(x: &[T]) -> f64 {
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        x.par_iter().map(|xi| xi.modulus_sqr()).sum::<f64>().sqrt()
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter().map(|xi| xi.modulus_sqr()).sum::<f64>().sqrt()
    }
}

/// `‖x‖₁`
pub fn norm1<T: Scalar>(x: &[T]) -> f64 {
    x.iter().map(|xi| xi.modulus()).sum()
}

/// `‖x‖∞`
pub fn norm_inf<T: Scalar>(x: &[T]) -> f64 {
    x.iter().map(|xi| xi.modulus()).fold(0.0, f64::max)
}

/// y ← y + α x
pub fn axpy<T: Scalar>(alpha: T, x: &[T], y: &mut [T]) {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * *xi;
    }
}

/// r ← b − r, where `r` holds A x on input.
pub fn residual_in_place<T: Scalar>(b: &[T], r: &mut [T]) {
    for (ri, bi) in r.iter_mut().zip(b) {
        *ri = *bi - *ri;
    }
}
