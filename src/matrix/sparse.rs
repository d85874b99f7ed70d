//! Fixed-pattern CSR storage for Jacobians.
//!
//! The nonzero structure of a finite-element Jacobian is determined once from the mesh
//! connectivity. [`PatternBuilder`] collects `(row, col)` couplings, [`JacobianStructure`] is the
//! immutable compressed pattern, and [`CsrMatrix`] attaches numeric values to a shared pattern.
//! Re-assembly only ever overwrites values; the pattern itself cannot change after `build`.

use crate::core::scalar::Scalar;
use crate::core::traits::LinearOperator;
use crate::error::NoxError;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Collects the couplings of a Jacobian before compression.
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    n: usize,
    rows: Vec<BTreeSet<usize>>,
}

impl PatternBuilder {
    pub fn new(n: usize) -> Self {
        Self { n, rows: vec![BTreeSet::new(); n] }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    /// Declare that entry (row, col) may be nonzero. Out-of-range indices panic.
    pub fn insert(&mut self, row: usize, col: usize) {
        assert!(row < self.n && col < self.n, "({row}, {col}) outside a {0}x{0} pattern", self.n);
        self.rows[row].insert(col);
    }

    /// Declare a dense coupling block between all `dofs` (one element's local DOFs).
    pub fn insert_block(&mut self, dofs: &[usize]) {
        for &i in dofs {
            for &j in dofs {
                self.insert(i, j);
            }
        }
    }

    /// Compress into an immutable pattern. Diagonal entries are always present.
    pub fn build(mut self) -> JacobianStructure {
        for i in 0..self.n {
            self.rows[i].insert(i);
        }
        let mut row_ptr = Vec::with_capacity(self.n + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);
        for row in &self.rows {
            col_idx.extend(row.iter().copied());
            row_ptr.push(col_idx.len());
        }
        JacobianStructure { n: self.n, row_ptr, col_idx }
    }
}

/// Compressed sparse row pattern (sorted column indices per row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JacobianStructure {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
}

impl JacobianStructure {
    pub fn nrows(&self) -> usize {
        self.n
    }

    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    /// Column indices of row `i`.
    pub fn row(&self, i: usize) -> &[usize] {
        &self.col_idx[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    /// Position of (row, col) in the value array.
    pub fn find(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.n {
            return None;
        }
        let start = self.row_ptr[row];
        self.row(row).binary_search(&col).ok().map(|k| start + k)
    }
}

/// Numeric values over a shared [`JacobianStructure`].
#[derive(Debug, Clone)]
pub struct CsrMatrix<T> {
    structure: Arc<JacobianStructure>,
    values: Vec<T>,
    finished: bool,
}

impl<T: Scalar> CsrMatrix<T> {
    /// Zero-valued matrix over `structure`.
    pub fn new(structure: Arc<JacobianStructure>) -> Self {
        let nnz = structure.nnz();
        Self { structure, values: vec![T::zero(); nnz], finished: true }
    }

    /// Build a CSR from raw row-ptr, col-idx, and values.
    ///
    /// `row_ptr` must start at 0, never decrease and end at `col_idx.len()`; columns must be below `n`.
    pub fn from_csr(n: usize, row_ptr: Vec<usize>, col_idx: Vec<usize>, values: Vec<T>) -> Result<Self, NoxError> {
        if row_ptr.len() != n + 1 {
            return Err(NoxError::DimensionMismatch { expected: n + 1, found: row_ptr.len() });
        }
        if values.len() != col_idx.len() {
            return Err(NoxError::DimensionMismatch { expected: col_idx.len(), found: values.len() });
        }
        if row_ptr[0] != 0 {
            return Err(NoxError::DimensionMismatch { expected: 0, found: row_ptr[0] });
        }
        if row_ptr[n] != col_idx.len() {
            return Err(NoxError::DimensionMismatch { expected: col_idx.len(), found: row_ptr[n] });
        }
        if let Some(i) = row_ptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(NoxError::DimensionMismatch { expected: row_ptr[i], found: row_ptr[i + 1] });
        }
        for i in 0..n {
            if let Some(&j) = col_idx[row_ptr[i]..row_ptr[i + 1]].iter().find(|&&j| j >= n) {
                return Err(NoxError::OutsidePattern { row: i, col: j });
            }
        }
        let mut pb = PatternBuilder::new(n);
        for i in 0..n {
            for &j in &col_idx[row_ptr[i]..row_ptr[i + 1]] {
                pb.insert(i, j);
            }
        }
        let mut m = Self::new(Arc::new(pb.build()));
        for i in 0..n {
            for k in row_ptr[i]..row_ptr[i + 1] {
                m.add(i, col_idx[k], values[k])?;
            }
        }
        m.finish();
        Ok(m)
    }

    pub fn structure(&self) -> &Arc<JacobianStructure> {
        &self.structure
    }

    pub fn nrows(&self) -> usize {
        self.structure.nrows()
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Reset all values to zero, keeping the pattern.
    pub fn zero(&mut self) {
        self.values.iter_mut().for_each(|v| *v = T::zero());
        self.finished = false;
    }

    /// Accumulate `v` into entry (row, col).
    pub fn add(&mut self, row: usize, col: usize, v: T) -> Result<(), NoxError> {
        let k = self.structure.find(row, col).ok_or(NoxError::OutsidePattern { row, col })?;
        self.values[k] += v;
        Ok(())
    }

    /// Accumulate a dense element block `block[a * dofs.len() + b]` at (dofs[a], dofs[b]).
    pub fn add_block(&mut self, dofs: &[usize], block: &[T]) -> Result<(), NoxError> {
        let m = dofs.len();
        if block.len() != m * m {
            return Err(NoxError::DimensionMismatch { expected: m * m, found: block.len() });
        }
        for (a, &i) in dofs.iter().enumerate() {
            for (b, &j) in dofs.iter().enumerate() {
                self.add(i, j, block[a * m + b])?;
            }
        }
        Ok(())
    }

    /// Mark assembly as complete.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Entry (row, col), zero outside the pattern.
    pub fn get(&self, row: usize, col: usize) -> T {
        self.structure.find(row, col).map_or(T::zero(), |k| self.values[k])
    }

    /// Main diagonal.
    pub fn diagonal(&self) -> Vec<T> {
        (0..self.nrows()).map(|i| self.get(i, i)).collect()
    }

    /// Sparse matrix-vector product y = A x.
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.nrows(), "Input vector x has incorrect length");
        assert_eq!(y.len(), self.nrows(), "Output vector y has incorrect length");
        let rp = self.structure.row_ptr();
        let ci = self.structure.col_idx();
        for i in 0..self.nrows() {
            let mut sum = T::zero();
            for k in rp[i]..rp[i + 1] {
                sum += self.values[k] * x[ci[k]];
            }
            y[i] = sum;
        }
    }

    /// Dense copy, column-major.
    pub fn to_col_major(&self) -> Vec<T> {
        let n = self.nrows();
        let mut a = vec![T::zero(); n * n];
        for i in 0..n {
            for (k, &j) in self.structure.row(i).iter().enumerate() {
                a[j * n + i] = self.values[self.structure.row_ptr()[i] + k];
            }
        }
        a
    }
}

#[cfg(feature = "rayon")]
impl<T: Scalar> CsrMatrix<T> {
    /// Parallel SpMV using Rayon
    pub fn spmv_parallel(&self, x: &[T], y: &mut [T]) {
        use rayon::prelude::*;
        assert_eq!(x.len(), self.nrows());
        assert_eq!(y.len(), self.nrows());
        let rp = self.structure.row_ptr();
        let ci = self.structure.col_idx();
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            let mut sum = T::zero();
            for k in rp[i]..rp[i + 1] {
                sum += self.values[k] * x[ci[k]];
            }
            *yi = sum;
        });
    }
}

impl<T: Scalar> LinearOperator<T> for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.structure.nrows()
    }

    fn matvec(&self, x: &[T], y: &mut [T]) -> Result<(), NoxError> {
        if x.len() != self.nrows() {
            return Err(NoxError::DimensionMismatch { expected: self.nrows(), found: x.len() });
        }
        #[cfg(feature = "rayon")]
        self.spmv_parallel(x, y);
        #[cfg(not(feature = "rayon"))]
        self.spmv(x, y);
        Ok(())
    }

    fn as_csr(&self) -> Option<&CsrMatrix<T>> {
        Some(self)
    }
}
