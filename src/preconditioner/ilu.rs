//! ILU(0) factorization with zero fill (Saad §10.3), the "Ifpack" preconditioner kind.
//!
//! The factors live on the Jacobian's own sparsity pattern: L (unit diagonal) below the
//! diagonal and U on and above it, packed into a single value array.

use crate::core::scalar::Scalar;
use crate::error::NoxError;
use crate::matrix::sparse::CsrMatrix;
use crate::preconditioner::{Precond, Preconditioner};

#[derive(Debug, Clone)]
pub struct Ilu0<T> {
    snapshot: Option<CsrMatrix<T>>,
    lu: Option<CsrMatrix<T>>,
    diag_pos: Vec<usize>,
}

impl<T: Scalar> Ilu0<T> {
    pub fn new() -> Self {
        Self { snapshot: None, lu: None, diag_pos: Vec::new() }
    }

    fn factorize(a: &CsrMatrix<T>) -> Result<(CsrMatrix<T>, Vec<usize>), NoxError> {
        let s = a.structure().clone();
        let n = s.nrows();
        let rp = s.row_ptr();
        let ci = s.col_idx();
        let mut vals = a.values().to_vec();
        let diag_pos = (0..n)
            .map(|i| s.find(i, i).ok_or(NoxError::ZeroPivot(i)))
            .collect::<Result<Vec<_>, _>>()?;

        // IKJ variant: eliminate row i with every earlier row k it couples to.
        for i in 1..n {
            for kk in rp[i]..rp[i + 1] {
                let k = ci[kk];
                if k >= i {
                    break;
                }
                let pivot = vals[diag_pos[k]];
                if pivot == T::zero() {
                    return Err(NoxError::ZeroPivot(k));
                }
                let lik = vals[kk] / pivot;
                vals[kk] = lik;
                for jj in (kk + 1)..rp[i + 1] {
                    let j = ci[jj];
                    if let Some(kj) = s.find(k, j) {
                        let ukj = vals[kj];
                        vals[jj] -= lik * ukj;
                    }
                }
            }
        }
        if let Some(i) = (0..n).find(|&i| vals[diag_pos[i]] == T::zero()) {
            return Err(NoxError::ZeroPivot(i));
        }
        let mut lu = a.clone();
        lu.values_mut().copy_from_slice(&vals);
        lu.finish();
        Ok((lu, diag_pos))
    }
}

impl<T: Scalar> Default for Ilu0<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Preconditioner<T> for Ilu0<T> {
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<(), NoxError> {
        let lu = self.lu.as_ref().ok_or(NoxError::Unsupported("ILU(0) applied before compute"))?;
        let s = lu.structure();
        let (rp, ci, vals) = (s.row_ptr(), s.col_idx(), lu.values());
        let n = s.nrows();
        if r.len() != n {
            return Err(NoxError::DimensionMismatch { expected: n, found: r.len() });
        }
        // solve L y = r
        for i in 0..n {
            let mut acc = r[i];
            for k in rp[i]..self.diag_pos[i] {
                acc -= vals[k] * z[ci[k]];
            }
            z[i] = acc;
        }
        // solve U z = y
        for i in (0..n).rev() {
            let mut acc = z[i];
            for k in (self.diag_pos[i] + 1)..rp[i + 1] {
                acc -= vals[k] * z[ci[k]];
            }
            z[i] = acc / vals[self.diag_pos[i]];
        }
        Ok(())
    }
}

impl<T: Scalar> Precond<T> for Ilu0<T> {
    fn create(&mut self, jac: &CsrMatrix<T>) -> Result<(), NoxError> {
        self.snapshot = Some(jac.clone());
        Ok(())
    }

    fn compute(&mut self) -> Result<(), NoxError> {
        let a = self.snapshot.as_ref().ok_or(NoxError::Unsupported("ILU(0) computed before create"))?;
        let (lu, diag_pos) = Self::factorize(a)?;
        self.lu = Some(lu);
        self.diag_pos = diag_pos;
        Ok(())
    }

    fn operator(&self) -> &dyn Preconditioner<T> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::sparse::PatternBuilder;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    #[test]
    fn exact_on_tridiagonal() {
        // ILU(0) produces no fill on a tridiagonal matrix, so it is an exact LU.
        let n = 6;
        let mut pb = PatternBuilder::new(n);
        for i in 1..n {
            pb.insert_block(&[i - 1, i]);
        }
        let mut a = CsrMatrix::new(Arc::new(pb.build()));
        for i in 0..n {
            a.add(i, i, 4.0).unwrap();
            if i > 0 {
                a.add(i, i - 1, -1.0).unwrap();
                a.add(i - 1, i, -2.0).unwrap();
            }
        }
        let x_true: Vec<f64> = (0..n).map(|i| i as f64 + 1.0).collect();
        let mut b = vec![0.0; n];
        a.spmv(&x_true, &mut b);

        let mut pc = Ilu0::new();
        pc.create(&a).unwrap();
        pc.compute().unwrap();
        let mut z = vec![0.0; n];
        pc.apply(&b, &mut z).unwrap();
        for (zi, xi) in z.iter().zip(&x_true) {
            assert_abs_diff_eq!(*zi, *xi, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_pivot_is_reported() {
        let a = CsrMatrix::from_csr(2, vec![0, 2, 4], vec![0, 1, 0, 1], vec![0.0, 1.0, 1.0, 1.0]).unwrap();
        let mut pc = Ilu0::new();
        pc.create(&a).unwrap();
        assert_eq!(pc.compute(), Err(NoxError::ZeroPivot(0)));
    }
}
