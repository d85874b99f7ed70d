//! Aggregation-based algebraic multigrid, the "ML" preconditioner kind.
//!
//! Setup coarsens the Jacobian by greedy aggregation of strongly connected DOFs. The
//! piecewise-constant tentative interpolation is smoothed by one damped-Jacobi step, and the
//! Galerkin coarse operators Pᵀ A P are formed directly on the CSR pattern. One application is a
//! V-cycle with damped-Jacobi smoothing; the coarsest level is solved with a dense LU.

use crate::core::scalar::Scalar;
use crate::core::wrappers::residual_in_place;
use crate::error::NoxError;
use crate::matrix::sparse::{CsrMatrix, PatternBuilder};
use crate::preconditioner::jacobi::Jacobi;
use crate::preconditioner::{Precond, Preconditioner};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Jacobi damping used by the smoother.
const OMEGA: f64 = 2.0 / 3.0;

pub struct Amg<T> {
    /// Maximum number of levels including the coarsest
    pub max_levels: usize,
    /// Stop coarsening at or below this many unknowns
    pub coarse_size: usize,
    /// Strength-of-connection threshold θ
    pub threshold: f64,
    /// Pre- and post-smoothing sweeps
    pub nu_pre: usize,
    pub nu_post: usize,
    snapshot: Option<CsrMatrix<T>>,
    levels: Vec<AmgLevel<T>>,
    coarsest: Option<(usize, Vec<T>)>,
}

struct AmgLevel<T> {
    a: CsrMatrix<T>,
    diag_inv: Vec<T>,
    p: Prolongator<T>,
}

/// Sparse n_fine × n_coarse interpolation, stored by fine row.
struct Prolongator<T> {
    rows: Vec<Vec<(usize, T)>>,
    n_coarse: usize,
}

impl<T: Scalar> Prolongator<T> {
    fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// rc ← Pᵀ r
    fn restrict(&self, r: &[T], rc: &mut [T]) {
        rc.iter_mut().for_each(|v| *v = T::zero());
        for (row, &ri) in self.rows.iter().zip(r) {
            for &(c, p) in row {
                rc[c] += p * ri;
            }
        }
    }

    /// x ← x + P e
    fn prolongate_add(&self, e: &[T], x: &mut [T]) {
        for (row, xi) in self.rows.iter().zip(x.iter_mut()) {
            for &(c, p) in row {
                *xi += p * e[c];
            }
        }
    }
}

impl<T: Scalar> Amg<T> {
    pub fn new() -> Self {
        Self {
            max_levels: 10,
            coarse_size: 40,
            threshold: 0.08,
            nu_pre: 1,
            nu_post: 1,
            snapshot: None,
            levels: Vec::new(),
            coarsest: None,
        }
    }

    /// Number of levels of the current hierarchy (0 before `compute`).
    pub fn num_levels(&self) -> usize {
        self.levels.len() + usize::from(self.coarsest.is_some())
    }

    fn build(&mut self, a: &CsrMatrix<T>) -> Result<(), NoxError> {
        self.levels.clear();
        let mut current = a.clone();
        while self.levels.len() + 1 < self.max_levels && current.nrows() > self.coarse_size {
            let aggregates = greedy_aggregation(&current, self.threshold);
            let n_coarse = aggregates.iter().copied().max().map_or(0, |m| m + 1);
            if n_coarse == 0 || n_coarse == current.nrows() {
                break;
            }
            let diag_inv = Jacobi::invert(&current.diagonal());
            let p = smoothed_prolongator(&current, &aggregates, n_coarse, &diag_inv);
            let coarse = galerkin_product(&current, &p)?;
            log::trace!("AMG level {}: {} -> {} unknowns", self.levels.len(), current.nrows(), n_coarse);
            self.levels.push(AmgLevel { a: current, diag_inv, p });
            current = coarse;
        }
        self.coarsest = Some((current.nrows(), current.to_col_major()));
        Ok(())
    }

    fn smooth(level: &AmgLevel<T>, b: &[T], x: &mut [T], sweeps: usize) -> Result<(), NoxError> {
        let n = b.len();
        let mut ax = vec![T::zero(); n];
        let omega = T::from_real(OMEGA);
        for _ in 0..sweeps {
            level.a.spmv(x, &mut ax);
            for i in 0..n {
                x[i] += omega * level.diag_inv[i] * (b[i] - ax[i]);
            }
        }
        Ok(())
    }

    fn v_cycle(&self, depth: usize, b: &[T], x: &mut [T]) -> Result<(), NoxError> {
        let Some(level) = self.levels.get(depth) else {
            let (n, dense) = self.coarsest.as_ref().ok_or(NoxError::Unsupported("AMG applied before compute"))?;
            x.copy_from_slice(b);
            return T::dense_solve(*n, dense, x);
        };
        let n = b.len();
        x.iter_mut().for_each(|v| *v = T::zero());
        Self::smooth(level, b, x, self.nu_pre)?;

        let mut r = vec![T::zero(); n];
        level.a.spmv(x, &mut r);
        residual_in_place(b, &mut r);
        let mut rc = vec![T::zero(); level.p.n_coarse];
        level.p.restrict(&r, &mut rc);
        let mut ec = vec![T::zero(); level.p.n_coarse];
        self.v_cycle(depth + 1, &rc, &mut ec)?;
        level.p.prolongate_add(&ec, x);

        Self::smooth(level, b, x, self.nu_post)
    }
}

impl<T: Scalar> Default for Amg<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Preconditioner<T> for Amg<T> {
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<(), NoxError> {
        self.v_cycle(0, r, z)
    }
}

impl<T: Scalar> Precond<T> for Amg<T> {
    fn create(&mut self, jac: &CsrMatrix<T>) -> Result<(), NoxError> {
        self.snapshot = Some(jac.clone());
        Ok(())
    }

    fn compute(&mut self) -> Result<(), NoxError> {
        let a = self.snapshot.take().ok_or(NoxError::Unsupported("AMG computed before create"))?;
        let res = self.build(&a);
        self.snapshot = Some(a);
        res
    }

    fn operator(&self) -> &dyn Preconditioner<T> {
        self
    }
}

/// j is strongly connected to i when |a_ij| ≥ θ √(|a_ii| |a_jj|).
fn strong_neighbors<T: Scalar>(a: &CsrMatrix<T>, diag: &[f64], i: usize, threshold: f64) -> Vec<usize> {
    let s = a.structure();
    let start = s.row_ptr()[i];
    s.row(i)
        .iter()
        .enumerate()
        .filter(|&(_, &j)| j != i)
        .filter(|&(k, &j)| a.values()[start + k].modulus() >= threshold * (diag[i] * diag[j]).sqrt())
        .map(|(_, &j)| j)
        .collect()
}

/// Two-pass greedy aggregation: seed aggregates from fully free neighborhoods, then attach leftovers.
fn greedy_aggregation<T: Scalar>(a: &CsrMatrix<T>, threshold: f64) -> Vec<usize> {
    let n = a.nrows();
    let diag: Vec<f64> = a.diagonal().iter().map(|d| d.modulus()).collect();
    let strong: Vec<Vec<usize>> = (0..n).map(|i| strong_neighbors(a, &diag, i, threshold)).collect();
    let mut agg = vec![usize::MAX; n];
    let mut next = 0;
    for i in 0..n {
        if agg[i] != usize::MAX || strong[i].iter().any(|&j| agg[j] != usize::MAX) {
            continue;
        }
        agg[i] = next;
        for &j in &strong[i] {
            agg[j] = next;
        }
        next += 1;
    }
    for i in 0..n {
        if agg[i] != usize::MAX {
            continue;
        }
        match strong[i].iter().find(|&&j| agg[j] != usize::MAX) {
            Some(&j) => agg[i] = agg[j],
            None => {
                agg[i] = next;
                next += 1;
            }
        }
    }
    agg
}

/// P = (I − ω D⁻¹ A) P₀ for the piecewise-constant P₀ given by `aggregates`.
///
/// ω = 4 / (3ρ), with ρ(D⁻¹A) bounded by its largest Gershgorin row sum.
fn smoothed_prolongator<T: Scalar>(a: &CsrMatrix<T>, aggregates: &[usize], n_coarse: usize, diag_inv: &[T]) -> Prolongator<T> {
    let s = a.structure();
    let row_values = |i: usize| &a.values()[s.row_ptr()[i]..s.row_ptr()[i + 1]];
    let rho = (0..a.nrows())
        .map(|i| diag_inv[i].modulus() * row_values(i).iter().map(|v| v.modulus()).sum::<f64>())
        .fold(0.0, f64::max);
    let omega = if rho > 0.0 { 4.0 / (3.0 * rho) } else { 0.0 };
    let rows = (0..a.nrows())
        .map(|i| {
            let mut row = BTreeMap::new();
            row.insert(aggregates[i], T::one());
            let w = T::from_real(omega) * diag_inv[i];
            for (&j, &v) in s.row(i).iter().zip(row_values(i)) {
                *row.entry(aggregates[j]).or_insert_with(T::zero) -= w * v;
            }
            row.into_iter().filter(|(_, v)| *v != T::zero()).collect::<Vec<_>>()
        })
        .collect();
    Prolongator { rows, n_coarse }
}

/// A_c = Pᵀ A P.
fn galerkin_product<T: Scalar>(a: &CsrMatrix<T>, p: &Prolongator<T>) -> Result<CsrMatrix<T>, NoxError> {
    let s = a.structure();
    let mut coarse_rows: Vec<BTreeMap<usize, T>> = vec![BTreeMap::new(); p.n_coarse];
    for i in 0..a.nrows() {
        // row i of A P
        let mut ap = BTreeMap::new();
        let start = s.row_ptr()[i];
        for (k, &j) in s.row(i).iter().enumerate() {
            for &(c, pv) in &p.rows[j] {
                *ap.entry(c).or_insert_with(T::zero) += a.values()[start + k] * pv;
            }
        }
        for &(r, pv) in &p.rows[i] {
            for (&c, &v) in &ap {
                *coarse_rows[r].entry(c).or_insert_with(T::zero) += pv * v;
            }
        }
    }
    let mut pb = PatternBuilder::new(p.n_coarse);
    for (r, row) in coarse_rows.iter().enumerate() {
        for &c in row.keys() {
            pb.insert(r, c);
        }
    }
    let mut coarse = CsrMatrix::new(Arc::new(pb.build()));
    for (r, row) in coarse_rows.into_iter().enumerate() {
        for (c, v) in row {
            coarse.add(r, c, v)?;
        }
    }
    coarse.finish();
    Ok(coarse)
}
