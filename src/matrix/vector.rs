//! Coefficient vector: the dense DOF array handed between the solver and the assembly layer.

use crate::core::scalar::Scalar;
use std::ops::{Deref, DerefMut};

/// Dense vector of degrees of freedom.
#[derive(Debug, Clone, PartialEq)]
pub struct CoeffVector<T> {
    data: Vec<T>,
}

impl<T: Scalar> CoeffVector<T> {
    /// Zero vector of length `n`.
    pub fn alloc(n: usize) -> Self {
        Self { data: vec![T::zero(); n] }
    }

    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn set(&mut self, i: usize, v: T) {
        self.data[i] = v;
    }

    pub fn get(&self, i: usize) -> T {
        self.data[i]
    }

    pub fn zero(&mut self) {
        self.data.iter_mut().for_each(|v| *v = T::zero());
    }

    /// Copy exactly `self.len()` values from `values`.
    ///
    /// # Panics
    /// Panics if `values` has a different length.
    pub fn copy_from(&mut self, values: &[T]) {
        assert_eq!(
            values.len(),
            self.data.len(),
            "coefficient array has {} entries, the problem has {} DOFs",
            values.len(),
            self.data.len()
        );
        self.data.copy_from_slice(values);
    }

    /// Owned copy of the values.
    pub fn extract(&self) -> Vec<T> {
        self.data.clone()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> Deref for CoeffVector<T> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for CoeffVector<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> AsRef<[T]> for CoeffVector<T> {
    fn as_ref(&self) -> &[T] {
        &self.data
    }
}

impl<T> From<Vec<T>> for CoeffVector<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}
