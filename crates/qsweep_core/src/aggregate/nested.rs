//! Nested lists mirroring the sweep structure

use serde::{Deserialize, Serialize};

use crate::error::AggregationError;

/// A value or an arbitrarily deep list of values.
///
/// Serialised untagged, so a two-group sweep of scalars becomes a plain
/// `[[..], [..]]` JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nested<T> {
    Leaf(T),
    List(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    /// Wrap the samples of one point; a single sample becomes a scalar
    #[must_use]
    pub fn from_samples(mut samples: Vec<T>) -> Self {
        if samples.len() == 1
            && let Some(only) = samples.pop()
        {
            return Nested::Leaf(only);
        }
        Nested::List(samples.into_iter().map(Nested::Leaf).collect())
    }

    #[must_use]
    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Nested::Leaf(value) => Some(value),
            Nested::List(_) => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Nested<T>]> {
        match self {
            Nested::Leaf(_) => None,
            Nested::List(items) => Some(items),
        }
    }

    /// Follow `path` one list level per index
    #[must_use]
    pub fn get(&self, path: &[usize]) -> Option<&Nested<T>> {
        path.iter()
            .try_fold(self, |node, &i| node.as_list().and_then(|items| items.get(i)))
    }
}

/// Partition `items` into nested lists of the given sizes, outermost first.
///
/// The innermost level takes `sizes[last]` consecutive items. With no sizes
/// the single item is returned as is.
pub fn reshape<T>(items: Vec<Nested<T>>, sizes: &[usize]) -> Result<Nested<T>, AggregationError> {
    let expected: usize = sizes.iter().product();
    let found = items.len();
    if found != expected {
        return Err(AggregationError::ShapeMismatch { expected, found });
    }

    let mut level = items;
    for &size in sizes.iter().rev() {
        level = chunk(level, size);
    }
    level
        .pop()
        .ok_or(AggregationError::ShapeMismatch { expected, found })
}

fn chunk<T>(items: Vec<Nested<T>>, size: usize) -> Vec<Nested<T>> {
    if size == 0 {
        return vec![Nested::List(Vec::new())];
    }
    let mut out = Vec::with_capacity(items.len() / size);
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        out.push(Nested::List(iter.by_ref().take(size).collect()));
    }
    out
}

/// Inverse of [`reshape`]: concatenate `depth` list levels
#[must_use]
pub fn flatten<T>(nested: Nested<T>, depth: usize) -> Vec<Nested<T>> {
    match nested {
        Nested::List(items) if depth > 0 => items
            .into_iter()
            .flat_map(|item| flatten(item, depth - 1))
            .collect(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<Nested<usize>> {
        (0..n).map(Nested::Leaf).collect()
    }

    #[test]
    fn test_reshape_innermost_consumes_last_size() {
        let nested = reshape(leaves(6), &[2, 3]).unwrap();
        let json = serde_json::to_string(&nested).unwrap();
        assert_eq!(json, "[[0,1,2],[3,4,5]]");
        assert_eq!(nested.get(&[1, 0]).and_then(Nested::as_leaf), Some(&3));
    }

    #[test]
    fn test_reshape_rejects_wrong_count() {
        assert_eq!(
            reshape(leaves(5), &[2, 3]),
            Err(AggregationError::ShapeMismatch {
                expected: 6,
                found: 5
            })
        );
    }

    #[test]
    fn test_reshape_without_sizes_returns_single_item() {
        assert_eq!(reshape(leaves(1), &[]).unwrap(), Nested::Leaf(0));
    }

    #[test]
    fn test_flatten_inverts_reshape() {
        let sizes = [2, 2, 3];
        let nested = reshape(leaves(12), &sizes).unwrap();
        assert_eq!(flatten(nested, sizes.len()), leaves(12));
    }

    #[test]
    fn test_from_samples_unwraps_scalars() {
        assert_eq!(Nested::from_samples(vec![1.5]), Nested::Leaf(1.5));
        assert_eq!(
            serde_json::to_string(&Nested::from_samples(vec![1.0, 2.0])).unwrap(),
            "[1.0,2.0]"
        );
    }
}
