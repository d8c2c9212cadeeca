//! Mixed-radix addressing of sweep points.
//!
//! A sweep over groups with sizes `[s1, .., sn]` has `s1 * .. * sn` points.
//! Each point is identified by a flat index; [`decompose`] turns it back into
//! one index per group with the last group advancing fastest.

use super::axis::{AxisGroup, SweepAxis};
use crate::error::ConfigError;

/// Group sizes of a prepared sweep and the number of points they span
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepIndexSpace {
    sizes: Vec<usize>,
    total: usize,
}

impl SweepIndexSpace {
    /// Compute one size per group.
    ///
    /// A lockstep group takes the length of its first axis; every other axis
    /// in the group must have the same length. With no groups the space holds
    /// a single point.
    pub fn prepare(axes: &[SweepAxis], groups: &[AxisGroup]) -> Result<Self, ConfigError> {
        let mut sizes = Vec::with_capacity(groups.len());
        for (g, group) in groups.iter().enumerate() {
            let mut size = None;
            for &a in &group.axes {
                let axis = axes
                    .get(a)
                    .ok_or(ConfigError::UnknownAxis { group: g, axis: a })?;
                let len = axis.len()?;
                match size {
                    None => size = Some(len),
                    Some(expected) if expected != len => {
                        return Err(ConfigError::LockstepLengthMismatch {
                            group: g,
                            axis: axis.label().to_string(),
                            expected,
                            found: len,
                        });
                    }
                    Some(_) => {}
                }
            }
            sizes.push(size.unwrap_or(1));
        }
        Ok(Self::from_sizes(sizes))
    }

    #[must_use]
    pub fn from_sizes(sizes: Vec<usize>) -> Self {
        let total = sizes.iter().product();
        Self { sizes, total }
    }

    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.sizes.len()
    }

    /// Per-group indices of a flat index, or `None` when out of range
    #[must_use]
    pub fn indices(&self, flat: usize) -> Option<Vec<usize>> {
        (flat < self.total).then(|| decompose(flat, &self.sizes))
    }
}

/// Split a flat index into per-group indices in declaration order, last group
/// fastest.
///
/// # Panics
/// Panics if any size is zero.
#[must_use]
pub fn decompose(flat: usize, sizes: &[usize]) -> Vec<usize> {
    let mut indices = vec![0; sizes.len()];
    let mut remaining = flat;
    for (slot, &size) in indices.iter_mut().zip(sizes).rev() {
        *slot = remaining % size;
        remaining /= size;
    }
    indices
}

/// Inverse of [`decompose`]
#[must_use]
pub fn compose(indices: &[usize], sizes: &[usize]) -> usize {
    indices
        .iter()
        .zip(sizes)
        .fold(0, |flat, (&index, &size)| flat * size + index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObjectId, Value};

    fn axis(key: &str, len: usize) -> SweepAxis {
        SweepAxis::new(ObjectId(0), key, (0..len).map(Value::from).collect())
    }

    #[test]
    fn test_decompose_last_group_fastest() {
        assert_eq!(decompose(5, &[3, 2]), vec![2, 1]);
        assert_eq!(decompose(1, &[3, 2]), vec![0, 1]);
        assert_eq!(decompose(2, &[3, 2]), vec![1, 0]);
        assert_eq!(compose(&[2, 1], &[3, 2]), 5);
        assert_eq!(decompose(0, &[]), Vec::<usize>::new());
    }

    #[test]
    fn test_decompose_is_a_bijection() {
        let sizes = [2, 3, 4];
        let mut seen = std::collections::BTreeSet::new();
        for flat in 0..24 {
            let indices = decompose(flat, &sizes);
            assert!(indices.iter().zip(&sizes).all(|(i, s)| i < s));
            assert_eq!(compose(&indices, &sizes), flat);
            assert!(seen.insert(indices));
        }
    }

    #[test]
    fn test_prepare_with_lockstep_group() {
        let axes = vec![axis("a", 3), axis("b", 2), axis("c", 2).lockstep()];
        let groups = super::super::group_axes(&axes);
        let space = SweepIndexSpace::prepare(&axes, &groups).unwrap();
        assert_eq!(space.sizes(), &[3, 2]);
        assert_eq!(space.total(), 6);
        assert_eq!(space.indices(5), Some(vec![2, 1]));
        assert_eq!(space.indices(6), None);
    }

    #[test]
    fn test_prepare_rejects_mismatched_lockstep() {
        let axes = vec![axis("a", 3), axis("b", 2).lockstep()];
        let groups = super::super::group_axes(&axes);
        assert_eq!(
            SweepIndexSpace::prepare(&axes, &groups),
            Err(ConfigError::LockstepLengthMismatch {
                group: 0,
                axis: "b".to_string(),
                expected: 3,
                found: 2,
            })
        );
    }

    #[test]
    fn test_prepare_rejects_undeclared_axis() {
        let axes = vec![axis("a", 3)];
        let groups = vec![AxisGroup { axes: vec![0, 4] }];
        assert_eq!(
            SweepIndexSpace::prepare(&axes, &groups),
            Err(ConfigError::UnknownAxis { group: 0, axis: 4 })
        );
    }

    #[test]
    fn test_empty_space_has_one_point() {
        let space = SweepIndexSpace::prepare(&[], &[]).unwrap();
        assert_eq!(space.total(), 1);
        assert_eq!(space.indices(0), Some(Vec::new()));
    }
}
