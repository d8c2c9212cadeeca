//! Dense N-dimensional result storage

use serde::{Deserialize, Serialize};

use crate::sweep::{compose, decompose};

/// N-dimensional grid with a flat row-major backing array.
///
/// The shape is the declared group sizes, so `get(&[i_1, .., i_n])` uses the
/// same per-group indices as a [`SweepPoint`](crate::executor::SweepPoint),
/// and the backing array is in flat-index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepGrid<T> {
    data: Vec<T>,
    shape: Vec<usize>,
}

impl<T> SweepGrid<T> {
    /// Create a grid from data in flat-index order; `None` if the length does
    /// not match the shape
    pub fn from_data(shape: Vec<usize>, data: Vec<T>) -> Option<Self> {
        (data.len() == shape.iter().product::<usize>()).then_some(Self { data, shape })
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of per-dimension indices, `None` when out of range
    #[must_use]
    pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
        let in_range = indices.len() == self.shape.len()
            && indices.iter().zip(&self.shape).all(|(i, size)| i < size);
        in_range.then(|| compose(indices, &self.shape))
    }

    #[must_use]
    pub fn multi_index(&self, flat: usize) -> Option<Vec<usize>> {
        (flat < self.data.len()).then(|| decompose(flat, &self.shape))
    }

    #[must_use]
    pub fn get(&self, indices: &[usize]) -> Option<&T> {
        self.flat_index(indices).and_then(|i| self.data.get(i))
    }

    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Iterate over `(indices, value)` pairs in flat-index order
    pub fn iter(&self) -> impl Iterator<Item = (Vec<usize>, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(flat, value)| (decompose(flat, &self.shape), value))
    }

    /// Values along `dim` with every other dimension fixed by `at`.
    ///
    /// `at[dim]` is ignored. Returns `None` if `dim` or `at` is out of range.
    #[must_use]
    pub fn line(&self, dim: usize, at: &[usize]) -> Option<Vec<&T>> {
        if dim >= self.ndim() {
            return None;
        }
        let mut indices = at.to_vec();
        (0..self.shape[dim])
            .map(|i| {
                *indices.get_mut(dim)? = i;
                self.get(&indices)
            })
            .collect()
    }

    /// Apply `f` to every value, keeping the shape
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> SweepGrid<U> {
        SweepGrid {
            data: self.data.iter().map(f).collect(),
            shape: self.shape.clone(),
        }
    }
}
