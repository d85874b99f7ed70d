//! Model problems shared by the integration tests.
#![allow(dead_code)]

use fenox::{AssemblyTarget, Complex64, FeProblem, NoxError, PatternBuilder};

/// Finite-difference discretization of −u'' + c u³ = 1 on (0, 1) with u(0) = u(1) = 0.
///
/// `c = 0` makes the problem linear.
pub struct Reaction {
    pub n: usize,
    pub c: f64,
    pub matrix_free: bool,
    pub fail: bool,
    pub invalidated: bool,
}

impl Reaction {
    pub fn new(n: usize, c: f64) -> Self {
        Self { n, c, matrix_free: false, fail: false, invalidated: false }
    }

    pub fn matrix_free(mut self) -> Self {
        self.matrix_free = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn inv_h2(&self) -> f64 {
        let h = 1.0 / (self.n + 1) as f64;
        1.0 / (h * h)
    }

    /// Residual evaluated outside the solver.
    pub fn residual(&self, u: &[f64]) -> Vec<f64> {
        let k = self.inv_h2();
        (0..self.n)
            .map(|i| {
                let left = if i > 0 { u[i - 1] } else { 0.0 };
                let right = if i + 1 < self.n { u[i + 1] } else { 0.0 };
                k * (2.0 * u[i] - left - right) + self.c * u[i].powi(3) - 1.0
            })
            .collect()
    }
}

impl FeProblem<f64> for Reaction {
    fn num_dofs(&self) -> usize {
        self.n
    }

    fn is_matrix_free(&self) -> bool {
        self.matrix_free
    }

    fn assemble(&mut self, u: &[f64], target: AssemblyTarget<'_, f64>) -> Result<(), NoxError> {
        if self.fail {
            return Err(NoxError::Assembly("element 0 has a negative Jacobian determinant".into()));
        }
        let k = self.inv_h2();
        match target {
            AssemblyTarget::Residual(f) => {
                for (fi, ri) in f.iter_mut().zip(self.residual(u)) {
                    *fi += ri;
                }
            }
            AssemblyTarget::Jacobian(jac) => {
                // one stiffness block per interior edge, the boundary edges only touch the diagonal
                let edge = [k, -k, -k, k];
                for i in 1..self.n {
                    jac.add_block(&[i - 1, i], &edge)?;
                }
                if self.n > 0 {
                    jac.add(0, 0, k)?;
                    jac.add(self.n - 1, self.n - 1, k)?;
                }
                for i in 0..self.n {
                    jac.add(i, i, 3.0 * self.c * u[i] * u[i])?;
                }
            }
        }
        Ok(())
    }

    fn create_jacobian_structure(&mut self, pattern: &mut PatternBuilder) {
        for i in 1..self.n {
            pattern.insert_block(&[i - 1, i]);
        }
    }

    fn invalidate_matrix(&mut self) {
        self.invalidated = true;
    }
}

/// F(x) = atan(x) on one DOF. Full Newton steps diverge from |x₀| ≳ 1.39.
pub struct Arctan;

impl FeProblem<f64> for Arctan {
    fn num_dofs(&self) -> usize {
        1
    }

    fn assemble(&mut self, x: &[f64], target: AssemblyTarget<'_, f64>) -> Result<(), NoxError> {
        match target {
            AssemblyTarget::Residual(f) => f[0] += x[0].atan(),
            AssemblyTarget::Jacobian(jac) => jac.add(0, 0, 1.0 / (1.0 + x[0] * x[0]))?,
        }
        Ok(())
    }

    fn create_jacobian_structure(&mut self, _pattern: &mut PatternBuilder) {}
}

/// Complex Helmholtz-like system (4 + i) uᵢ − uᵢ₋₁ − uᵢ₊₁ = 1.
pub struct Helmholtz {
    pub n: usize,
}

impl Helmholtz {
    pub fn apply(&self, u: &[Complex64]) -> Vec<Complex64> {
        let diag = Complex64::new(4.0, 1.0);
        (0..self.n)
            .map(|i| {
                let mut v = diag * u[i];
                if i > 0 {
                    v -= u[i - 1];
                }
                if i + 1 < self.n {
                    v -= u[i + 1];
                }
                v
            })
            .collect()
    }
}

impl FeProblem<Complex64> for Helmholtz {
    fn num_dofs(&self) -> usize {
        self.n
    }

    fn assemble(&mut self, u: &[Complex64], target: AssemblyTarget<'_, Complex64>) -> Result<(), NoxError> {
        match target {
            AssemblyTarget::Residual(f) => {
                for (fi, ai) in f.iter_mut().zip(self.apply(u)) {
                    *fi += ai - Complex64::new(1.0, 0.0);
                }
            }
            AssemblyTarget::Jacobian(jac) => {
                for i in 0..self.n {
                    jac.add(i, i, Complex64::new(4.0, 1.0))?;
                    if i > 0 {
                        jac.add(i, i - 1, Complex64::new(-1.0, 0.0))?;
                    }
                    if i + 1 < self.n {
                        jac.add(i, i + 1, Complex64::new(-1.0, 0.0))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn create_jacobian_structure(&mut self, pattern: &mut PatternBuilder) {
        for i in 1..self.n {
            pattern.insert_block(&[i - 1, i]);
        }
    }
}
