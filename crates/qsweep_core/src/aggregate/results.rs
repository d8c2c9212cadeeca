//! Collecting per-point outputs into named series

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::grid::SweepGrid;
use super::nested::{Nested, reshape};
use crate::error::{AggregationError, LookupError, SimError};
use crate::executor::{PointOutputs, PointResult};
use crate::model::Value;
use crate::sweep::{AxisGroup, SweepIndexSpace, compose, decompose};

/// All samples of one named output, one entry per point in flat-index order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSeries {
    name: String,
    samples: Vec<Vec<f64>>,
}

impl ResultSeries {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in flat-index order
    #[must_use]
    pub fn samples(&self) -> &[Vec<f64>] {
        &self.samples
    }

    /// Samples at the given per-group indices
    #[must_use]
    pub fn at(&self, sizes: &[usize], indices: &[usize]) -> Option<&[f64]> {
        let in_range = indices.len() == sizes.len()
            && indices.iter().zip(sizes).all(|(i, size)| i < size);
        if !in_range {
            return None;
        }
        self.samples.get(compose(indices, sizes)).map(Vec::as_slice)
    }

    /// Nest the samples so the outermost level indexes the last-declared
    /// group: `nested[i_n]..[i_1]`. Single-sample points become scalars.
    pub fn nested(&self, sizes: &[usize]) -> Result<Nested<f64>, AggregationError> {
        let expected: usize = sizes.iter().product();
        if self.samples.len() != expected {
            return Err(AggregationError::ShapeMismatch {
                expected,
                found: self.samples.len(),
            });
        }

        let reversed: Vec<usize> = sizes.iter().rev().copied().collect();
        let items = (0..expected)
            .map(|position| {
                let mut indices = decompose(position, &reversed);
                indices.reverse();
                let flat = compose(&indices, sizes);
                Nested::from_samples(self.samples[flat].clone())
            })
            .collect();
        reshape(items, &reversed)
    }

    /// Dense grid over the declared group sizes
    pub fn to_grid(&self, sizes: &[usize]) -> Result<SweepGrid<Vec<f64>>, AggregationError> {
        SweepGrid::from_data(sizes.to_vec(), self.samples.clone()).ok_or(
            AggregationError::ShapeMismatch {
                expected: sizes.iter().product(),
                found: self.samples.len(),
            },
        )
    }
}

/// Collects point results in flat-index order and checks their consistency
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    total: usize,
    next: usize,
    series: Option<BTreeMap<String, Vec<Vec<f64>>>>,
}

impl ResultAggregator {
    #[must_use]
    pub fn new(space: &SweepIndexSpace) -> Self {
        Self {
            total: space.total(),
            next: 0,
            series: None,
        }
    }

    /// Points collected so far
    #[must_use]
    pub fn collected(&self) -> usize {
        self.next
    }

    /// Append the outputs of the next point.
    ///
    /// The first point fixes the set of series names; every later point must
    /// report exactly the same names.
    pub fn collect(&mut self, flat_index: usize, outputs: PointOutputs) -> Result<(), AggregationError> {
        if flat_index != self.next {
            return Err(AggregationError::OutOfOrder {
                expected: self.next,
                found: flat_index,
            });
        }
        if flat_index >= self.total {
            return Err(AggregationError::ShapeMismatch {
                expected: self.total,
                found: flat_index + 1,
            });
        }

        match &mut self.series {
            None => {
                self.series = Some(
                    outputs
                        .into_iter()
                        .map(|(name, samples)| (name, vec![samples]))
                        .collect(),
                );
            }
            Some(series) => {
                if let Some(name) = series.keys().find(|name| !outputs.contains_key(*name)) {
                    return Err(AggregationError::MissingOutput {
                        flat_index,
                        name: name.clone(),
                    });
                }
                if let Some(name) = outputs.keys().find(|name| !series.contains_key(*name)) {
                    return Err(AggregationError::UnexpectedOutput {
                        flat_index,
                        name: name.clone(),
                    });
                }
                for (name, samples) in outputs {
                    if let Some(collected) = series.get_mut(&name) {
                        collected.push(samples);
                    }
                }
            }
        }

        self.next += 1;
        Ok(())
    }

    /// Collect a batch of results in flat-index order, whatever order they
    /// arrive in
    pub fn collect_all(&mut self, mut results: Vec<PointResult>) -> Result<(), AggregationError> {
        results.sort_by_key(|r| r.flat_index);
        for result in results {
            self.collect(result.flat_index, result.outputs)?;
        }
        Ok(())
    }

    /// Check that every point arrived and hand out the series
    pub fn finish(self) -> Result<Vec<ResultSeries>, AggregationError> {
        if self.next != self.total {
            return Err(AggregationError::Incomplete {
                expected: self.total,
                found: self.next,
            });
        }
        let series: Vec<ResultSeries> = self
            .series
            .unwrap_or_default()
            .into_iter()
            .map(|(name, samples)| ResultSeries { name, samples })
            .collect();
        debug!(points = self.total, series = series.len(), "aggregated results");
        Ok(series)
    }
}

/// Outcome of a sweep run: the sweep structure plus every named series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    sizes: Vec<usize>,
    groups: Vec<AxisGroup>,
    labels: Vec<String>,
    axis_values: Vec<Vec<Value>>,
    series: Vec<ResultSeries>,
}

impl SweepResults {
    pub(crate) fn new(
        space: &SweepIndexSpace,
        groups: Vec<AxisGroup>,
        labels: Vec<String>,
        axis_values: Vec<Vec<Value>>,
        series: Vec<ResultSeries>,
    ) -> Self {
        Self {
            sizes: space.sizes().to_vec(),
            groups,
            labels,
            axis_values,
            series,
        }
    }

    /// Group sizes in declaration order
    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    #[must_use]
    pub fn groups(&self) -> &[AxisGroup] {
        &self.groups
    }

    /// Axis labels in declaration order
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Values of each axis in declaration order
    #[must_use]
    pub fn axis_values(&self) -> &[Vec<Value>] {
        &self.axis_values
    }

    pub fn series_names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(ResultSeries::name)
    }

    pub fn series(&self, name: &str) -> Result<&ResultSeries, LookupError> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| LookupError::SeriesNotFound(name.to_string()))
    }

    /// The named series nested with the last-declared group outermost
    pub fn nested(&self, name: &str) -> Result<Nested<f64>, SimError> {
        Ok(self.series(name)?.nested(&self.sizes)?)
    }

    /// Samples of the named series at per-group indices in declaration order
    pub fn at(&self, name: &str, indices: &[usize]) -> Result<Option<&[f64]>, LookupError> {
        Ok(self.series(name)?.at(&self.sizes, indices))
    }

    pub fn grid(&self, name: &str) -> Result<SweepGrid<Vec<f64>>, SimError> {
        Ok(self.series(name)?.to_grid(&self.sizes)?)
    }
}
